use async_trait::async_trait;
use cinema_core::query::{Page, ShowOrderField, ShowQuery};
use cinema_core::show::normalize_price;
use cinema_core::{CoreError, CoreResult, Show, ShowInput, ShowRepository};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::{contains_pattern, is_foreign_key_violation, sql_bound};

pub struct PgShowRepository {
    pool: PgPool,
}

impl PgShowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ShowRow {
    id: i64,
    movie_title: String,
    room: String,
    price: Decimal,
    available_seats: i32,
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Show {
            id: row.id,
            movie_title: row.movie_title,
            room: row.room,
            price: normalize_price(row.price),
            available_seats: row.available_seats,
        }
    }
}

const SHOW_COLUMNS: &str = "id, movie_title, room, price, available_seats";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ShowQuery) {
    qb.push(" WHERE TRUE");
    for term in &query.search {
        qb.push(" AND movie_title ILIKE ").push_bind(contains_pattern(term));
    }
}

fn push_ordering(qb: &mut QueryBuilder<'_, Postgres>, query: &ShowQuery) {
    qb.push(" ORDER BY ");
    for key in &query.ordering {
        qb.push(match key.field {
            ShowOrderField::Id => "id",
            ShowOrderField::MovieTitle => "movie_title",
        });
        qb.push(if key.descending { " DESC, " } else { " ASC, " });
    }
    qb.push("id ASC");
}

#[async_trait]
impl ShowRepository for PgShowRepository {
    async fn list_shows(&self, query: &ShowQuery) -> CoreResult<Page<Show>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM shows");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        let mut select = QueryBuilder::new(format!("SELECT {SHOW_COLUMNS} FROM shows"));
        push_filters(&mut select, query);
        push_ordering(&mut select, query);
        select
            .push(" LIMIT ")
            .push_bind(sql_bound(query.page.limit))
            .push(" OFFSET ")
            .push_bind(sql_bound(query.page.offset));

        let rows = select
            .build_query_as::<ShowRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        Ok(Page {
            total: total as u64,
            items: rows.into_iter().map(Show::from).collect(),
        })
    }

    async fn get_show(&self, id: i64) -> CoreResult<Option<Show>> {
        let row = sqlx::query_as::<_, ShowRow>(&format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        Ok(row.map(Show::from))
    }

    async fn create_show(&self, show: &ShowInput) -> CoreResult<Show> {
        let row = sqlx::query_as::<_, ShowRow>(&format!(
            r#"
            INSERT INTO shows (movie_title, room, price, available_seats)
            VALUES ($1, $2, $3, $4)
            RETURNING {SHOW_COLUMNS}
            "#
        ))
        .bind(&show.movie_title)
        .bind(&show.room)
        .bind(show.price)
        .bind(show.available_seats)
        .fetch_one(&self.pool)
        .await
        .map_err(CoreError::backend)?;

        Ok(row.into())
    }

    async fn update_show(&self, id: i64, show: &ShowInput) -> CoreResult<Show> {
        let row = sqlx::query_as::<_, ShowRow>(&format!(
            r#"
            UPDATE shows
            SET movie_title = $1, room = $2, price = $3, available_seats = $4
            WHERE id = $5
            RETURNING {SHOW_COLUMNS}
            "#
        ))
        .bind(&show.movie_title)
        .bind(&show.room)
        .bind(show.price)
        .bind(show.available_seats)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::backend)?;

        row.map(Show::from)
            .ok_or_else(|| CoreError::NotFound(format!("Show {id}")))
    }

    async fn delete_show(&self, id: i64) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM shows WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(CoreError::NotFound(format!("Show {id}"))),
            Ok(_) => Ok(()),
            Err(err) if is_foreign_key_violation(&err) => Err(CoreError::Conflict(format!(
                "Cannot delete show {id} because it is referenced by existing reservations"
            ))),
            Err(err) => Err(CoreError::backend(err)),
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinema_core::query::{Page, ReservationOrderField, ReservationQuery};
use cinema_core::{
    CoreError, CoreResult, Reservation, ReservationInput, ReservationRepository, ReservationStatus,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::{contains_pattern, is_foreign_key_violation, sql_bound};

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    show_id: i64,
    show_movie_title: String,
    customer_name: String,
    seats: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = CoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ReservationStatus>()
            .map_err(|s| CoreError::Backend(format!("unknown reservation status {s:?} in row {}", row.id)))?;

        Ok(Reservation {
            id: row.id,
            show_id: row.show_id,
            show_movie_title: row.show_movie_title,
            customer_name: row.customer_name,
            seats: row.seats,
            status,
            created_at: row.created_at,
        })
    }
}

const JOINED_SELECT: &str = r#"
    SELECT r.id, r.show_id, s.movie_title AS show_movie_title,
           r.customer_name, r.seats, r.status, r.created_at
    FROM reservations r
    JOIN shows s ON s.id = r.show_id
"#;

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ReservationQuery) {
    qb.push(" WHERE TRUE");
    if let Some(show_id) = query.show_id {
        qb.push(" AND r.show_id = ").push_bind(show_id);
    }
    for term in &query.search {
        let pattern = contains_pattern(term);
        qb.push(" AND (r.customer_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.seats::TEXT ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.status ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.movie_title ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_ordering(qb: &mut QueryBuilder<'_, Postgres>, query: &ReservationQuery) {
    qb.push(" ORDER BY ");
    for key in &query.ordering {
        qb.push(match key.field {
            ReservationOrderField::Id => "r.id",
            ReservationOrderField::CreatedAt => "r.created_at",
        });
        qb.push(if key.descending { " DESC, " } else { " ASC, " });
    }
    qb.push("r.id ASC");
}

fn invalid_show(err: sqlx::Error, show_id: i64) -> CoreError {
    if is_foreign_key_violation(&err) {
        CoreError::InvalidReference { entity: "show", id: show_id }
    } else {
        CoreError::backend(err)
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn list_reservations(&self, query: &ReservationQuery) -> CoreResult<Page<Reservation>> {
        let mut count = QueryBuilder::new(
            "SELECT COUNT(*) FROM reservations r JOIN shows s ON s.id = r.show_id",
        );
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        let mut select = QueryBuilder::new(JOINED_SELECT);
        push_filters(&mut select, query);
        push_ordering(&mut select, query);
        select
            .push(" LIMIT ")
            .push_bind(sql_bound(query.page.limit))
            .push(" OFFSET ")
            .push_bind(sql_bound(query.page.offset));

        let rows = select
            .build_query_as::<ReservationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        Ok(Page {
            total: total as u64,
            items: rows
                .into_iter()
                .map(Reservation::try_from)
                .collect::<CoreResult<_>>()?,
        })
    }

    async fn get_reservation(&self, id: i64) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!("{JOINED_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn create_reservation(&self, reservation: &ReservationInput) -> CoreResult<Reservation> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            WITH inserted AS (
                INSERT INTO reservations (show_id, customer_name, seats, status)
                VALUES ($1, $2, $3, $4)
                RETURNING id, show_id, customer_name, seats, status, created_at
            )
            SELECT i.id, i.show_id, s.movie_title AS show_movie_title,
                   i.customer_name, i.seats, i.status, i.created_at
            FROM inserted i
            JOIN shows s ON s.id = i.show_id
            "#,
        )
        .bind(reservation.show_id)
        .bind(&reservation.customer_name)
        .bind(reservation.seats)
        .bind(reservation.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| invalid_show(err, reservation.show_id))?;

        row.try_into()
    }

    async fn update_reservation(&self, id: i64, reservation: &ReservationInput) -> CoreResult<Reservation> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            WITH updated AS (
                UPDATE reservations
                SET show_id = $1, customer_name = $2, seats = $3, status = $4
                WHERE id = $5
                RETURNING id, show_id, customer_name, seats, status, created_at
            )
            SELECT u.id, u.show_id, s.movie_title AS show_movie_title,
                   u.customer_name, u.seats, u.status, u.created_at
            FROM updated u
            JOIN shows s ON s.id = u.show_id
            "#,
        )
        .bind(reservation.show_id)
        .bind(&reservation.customer_name)
        .bind(reservation.seats)
        .bind(reservation.status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| invalid_show(err, reservation.show_id))?;

        row.ok_or_else(|| CoreError::NotFound(format!("Reservation {id}")))?
            .try_into()
    }

    async fn delete_reservation(&self, id: i64) -> CoreResult<()> {
        let done = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::backend)?;

        if done.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Reservation {id}")));
        }
        Ok(())
    }
}

//! List-query parameters shared by every repository backend.
//!
//! Search, ordering and paging are parsed once here and then interpreted by
//! each backend: the Postgres repositories translate them into SQL, the
//! memory store evaluates [`ShowQuery::matches`] and friends directly.

use std::cmp::Ordering;

use crate::reservation::Reservation;
use crate::show::Show;

/// Splits a raw `search` parameter into terms. Commas separate terms like
/// whitespace does; NUL bytes are dropped.
pub fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.replace('\0', "")
            .replace(',', " ")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Every term must appear, case-insensitively, in at least one field.
pub fn matches_search(terms: &[String], fields: &[&str]) -> bool {
    let haystacks: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
    terms.iter().all(|term| {
        let needle = term.to_lowercase();
        haystacks.iter().any(|h| h.contains(&needle))
    })
}

pub trait OrderField: Copy + PartialEq {
    fn parse(name: &str) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey<F> {
    pub field: F,
    pub descending: bool,
}

impl<F> OrderKey<F> {
    pub fn asc(field: F) -> Self {
        Self { field, descending: false }
    }

    pub fn desc(field: F) -> Self {
        Self { field, descending: true }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Parses `ordering=-created_at,id`. Unknown fields are skipped; when nothing
/// valid remains the default ordering is used.
pub fn parse_ordering<F: OrderField>(raw: Option<&str>, default: &[OrderKey<F>]) -> Vec<OrderKey<F>> {
    let keys: Vec<OrderKey<F>> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (descending, name) = match term.strip_prefix('-') {
                Some(name) => (true, name),
                None => (false, term),
            };
            F::parse(name).map(|field| OrderKey { field, descending })
        })
        .collect();

    if keys.is_empty() {
        default.to_vec()
    } else {
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOrderField {
    Id,
    MovieTitle,
}

impl OrderField for ShowOrderField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "movie_title" => Some(Self::MovieTitle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOrderField {
    Id,
    CreatedAt,
}

impl OrderField for ReservationOrderField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl PageRequest {
    /// 1-based page number.
    pub fn number(page: u64, size: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(size),
            limit: size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Number of matching rows before paging.
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Cuts one page out of an already filtered and ordered list.
    pub fn slice(items: Vec<T>, page: PageRequest) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Self { total, items }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowQuery {
    pub search: Vec<String>,
    pub ordering: Vec<OrderKey<ShowOrderField>>,
    pub page: PageRequest,
}

impl ShowQuery {
    pub const DEFAULT_ORDERING: [OrderKey<ShowOrderField>; 1] = [OrderKey {
        field: ShowOrderField::Id,
        descending: false,
    }];

    pub fn matches(&self, show: &Show) -> bool {
        matches_search(&self.search, &[&show.movie_title])
    }

    /// Requested ordering, ties broken by ascending id.
    pub fn compare(&self, a: &Show, b: &Show) -> Ordering {
        self.ordering
            .iter()
            .map(|key| {
                key.apply(match key.field {
                    ShowOrderField::Id => a.id.cmp(&b.id),
                    ShowOrderField::MovieTitle => a.movie_title.cmp(&b.movie_title),
                })
            })
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationQuery {
    pub show_id: Option<i64>,
    pub search: Vec<String>,
    pub ordering: Vec<OrderKey<ReservationOrderField>>,
    pub page: PageRequest,
}

impl ReservationQuery {
    pub const DEFAULT_ORDERING: [OrderKey<ReservationOrderField>; 1] = [OrderKey {
        field: ReservationOrderField::Id,
        descending: true,
    }];

    pub fn matches(&self, reservation: &Reservation) -> bool {
        if self.show_id.is_some_and(|id| id != reservation.show_id) {
            return false;
        }
        let seats = reservation.seats.to_string();
        matches_search(
            &self.search,
            &[
                &reservation.customer_name,
                &seats,
                reservation.status.as_str(),
                &reservation.show_movie_title,
            ],
        )
    }

    pub fn compare(&self, a: &Reservation, b: &Reservation) -> Ordering {
        self.ordering
            .iter()
            .map(|key| {
                key.apply(match key.field {
                    ReservationOrderField::Id => a.id.cmp(&b.id),
                    ReservationOrderField::CreatedAt => a.created_at.cmp(&b.created_at),
                })
            })
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::query::{Page, ReservationQuery, ShowQuery};
use crate::reservation::{Reservation, ReservationInput};
use crate::show::{Show, ShowInput};
use crate::CoreResult;

/// Repository trait for show data access
#[async_trait]
pub trait ShowRepository: Send + Sync {
    async fn list_shows(&self, query: &ShowQuery) -> CoreResult<Page<Show>>;

    async fn get_show(&self, id: i64) -> CoreResult<Option<Show>>;

    async fn create_show(&self, show: &ShowInput) -> CoreResult<Show>;

    /// Fails with `NotFound` when no show has this id.
    async fn update_show(&self, id: i64, show: &ShowInput) -> CoreResult<Show>;

    /// Fails with `Conflict` while reservations still reference the show.
    async fn delete_show(&self, id: i64) -> CoreResult<()>;
}

/// Repository trait for reservation data access.
///
/// Every returned reservation carries its show's current title.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn list_reservations(&self, query: &ReservationQuery) -> CoreResult<Page<Reservation>>;

    async fn get_reservation(&self, id: i64) -> CoreResult<Option<Reservation>>;

    /// Fails with `InvalidReference` when `show_id` names no show.
    async fn create_reservation(&self, reservation: &ReservationInput) -> CoreResult<Reservation>;

    async fn update_reservation(&self, id: i64, reservation: &ReservationInput) -> CoreResult<Reservation>;

    async fn delete_reservation(&self, id: i64) -> CoreResult<()>;
}

/// A record kept in the document store.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Schema-less JSON storage keyed by collection and id.
///
/// Documents come back in insertion order. Nothing here validates shape;
/// that happens at the serialization boundary.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(&self, collection: &str) -> CoreResult<Vec<Value>>;

    async fn get_document(&self, collection: &str, id: &str) -> CoreResult<Option<Value>>;

    /// Fails with `Conflict` when the id is taken.
    async fn insert_document(&self, collection: &str, id: &str, document: &Value) -> CoreResult<()>;

    /// Fails with `NotFound` when there is nothing to replace.
    async fn replace_document(&self, collection: &str, id: &str, document: &Value) -> CoreResult<()>;

    async fn delete_document(&self, collection: &str, id: &str) -> CoreResult<()>;
}

//! In-memory implementation of every repository trait.
//!
//! Used when `storage.backend = "memory"` and by the HTTP tests. State lives
//! behind one `tokio::sync::RwLock`, so a reservation write observes the show
//! table it references and a show delete observes the reservations that
//! protect it. Nothing is durable.

use async_trait::async_trait;
use chrono::Utc;
use cinema_core::query::{Page, ReservationQuery, ShowQuery};
use cinema_core::{
    CoreError, CoreResult, DocumentStore, Reservation, ReservationInput, ReservationRepository,
    Show, ShowInput, ShowRepository,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stored reservation columns; the show title is joined on read.
#[derive(Debug, Clone)]
struct ReservationRecord {
    id: i64,
    input: ReservationInput,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    next_show_id: i64,
    next_reservation_id: i64,
    shows: BTreeMap<i64, Show>,
    reservations: BTreeMap<i64, ReservationRecord>,
    /// Per collection, documents in insertion order.
    documents: HashMap<String, Vec<(String, Value)>>,
}

impl Tables {
    fn join(&self, record: &ReservationRecord) -> CoreResult<Reservation> {
        let show = self.shows.get(&record.input.show_id).ok_or_else(|| {
            CoreError::Backend(format!(
                "reservation {} references missing show {}",
                record.id, record.input.show_id
            ))
        })?;

        Ok(Reservation {
            id: record.id,
            show_id: record.input.show_id,
            show_movie_title: show.movie_title.clone(),
            customer_name: record.input.customer_name.clone(),
            seats: record.input.seats,
            status: record.input.status,
            created_at: record.created_at,
        })
    }

    fn check_show(&self, show_id: i64) -> CoreResult<()> {
        if self.shows.contains_key(&show_id) {
            Ok(())
        } else {
            Err(CoreError::InvalidReference { entity: "show", id: show_id })
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShowRepository for MemoryStore {
    async fn list_shows(&self, query: &ShowQuery) -> CoreResult<Page<Show>> {
        let tables = self.tables.read().await;
        let mut shows: Vec<Show> = tables
            .shows
            .values()
            .filter(|show| query.matches(show))
            .cloned()
            .collect();
        shows.sort_by(|a, b| query.compare(a, b));
        Ok(Page::slice(shows, query.page))
    }

    async fn get_show(&self, id: i64) -> CoreResult<Option<Show>> {
        Ok(self.tables.read().await.shows.get(&id).cloned())
    }

    async fn create_show(&self, show: &ShowInput) -> CoreResult<Show> {
        let mut tables = self.tables.write().await;
        tables.next_show_id += 1;
        let show = show.clone().into_show(tables.next_show_id);
        tables.shows.insert(show.id, show.clone());
        Ok(show)
    }

    async fn update_show(&self, id: i64, show: &ShowInput) -> CoreResult<Show> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .shows
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Show {id}")))?;
        *slot = show.clone().into_show(id);
        Ok(slot.clone())
    }

    async fn delete_show(&self, id: i64) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.shows.contains_key(&id) {
            return Err(CoreError::NotFound(format!("Show {id}")));
        }
        if tables.reservations.values().any(|r| r.input.show_id == id) {
            return Err(CoreError::Conflict(format!(
                "Cannot delete show {id} because it is referenced by existing reservations"
            )));
        }
        tables.shows.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn list_reservations(&self, query: &ReservationQuery) -> CoreResult<Page<Reservation>> {
        let tables = self.tables.read().await;
        let mut reservations = Vec::new();
        for record in tables.reservations.values() {
            let reservation = tables.join(record)?;
            if query.matches(&reservation) {
                reservations.push(reservation);
            }
        }
        reservations.sort_by(|a, b| query.compare(a, b));
        Ok(Page::slice(reservations, query.page))
    }

    async fn get_reservation(&self, id: i64) -> CoreResult<Option<Reservation>> {
        let tables = self.tables.read().await;
        tables
            .reservations
            .get(&id)
            .map(|record| tables.join(record))
            .transpose()
    }

    async fn create_reservation(&self, reservation: &ReservationInput) -> CoreResult<Reservation> {
        let mut tables = self.tables.write().await;
        tables.check_show(reservation.show_id)?;
        tables.next_reservation_id += 1;
        let record = ReservationRecord {
            id: tables.next_reservation_id,
            input: reservation.clone(),
            created_at: Utc::now(),
        };
        tables.reservations.insert(record.id, record.clone());
        tables.join(&record)
    }

    async fn update_reservation(&self, id: i64, reservation: &ReservationInput) -> CoreResult<Reservation> {
        let mut tables = self.tables.write().await;
        if !tables.reservations.contains_key(&id) {
            return Err(CoreError::NotFound(format!("Reservation {id}")));
        }
        tables.check_show(reservation.show_id)?;
        let record = tables
            .reservations
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Reservation {id}")))?;
        record.input = reservation.clone();
        let record = record.clone();
        tables.join(&record)
    }

    async fn delete_reservation(&self, id: i64) -> CoreResult<()> {
        self.tables
            .write()
            .await
            .reservations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("Reservation {id}")))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, collection: &str) -> CoreResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .get(collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_document(&self, collection: &str, id: &str) -> CoreResult<Option<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|(key, _)| key == id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn insert_document(&self, collection: &str, id: &str, document: &Value) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let docs = tables.documents.entry(collection.to_string()).or_default();
        if docs.iter().any(|(key, _)| key == id) {
            return Err(CoreError::Conflict(format!(
                "A document with id {id} already exists in {collection}"
            )));
        }
        docs.push((id.to_string(), document.clone()));
        Ok(())
    }

    async fn replace_document(&self, collection: &str, id: &str, document: &Value) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(key, _)| key == id))
            .ok_or_else(|| CoreError::NotFound(format!("Document {collection}:{id}")))?;
        slot.1 = document.clone();
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let docs = tables
            .documents
            .get_mut(collection)
            .ok_or_else(|| CoreError::NotFound(format!("Document {collection}:{id}")))?;
        let before = docs.len();
        docs.retain(|(key, _)| key != id);
        if docs.len() == before {
            return Err(CoreError::NotFound(format!("Document {collection}:{id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::query::{search_terms, PageRequest};
    use cinema_core::ReservationStatus;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn show_input(title: &str) -> ShowInput {
        ShowInput {
            movie_title: title.into(),
            room: "A1".into(),
            price: Decimal::new(1250, 2),
            available_seats: 100,
        }
    }

    fn reservation_input(show_id: i64, name: &str) -> ReservationInput {
        ReservationInput {
            show_id,
            customer_name: name.into(),
            seats: 2,
            status: ReservationStatus::Reserved,
        }
    }

    #[tokio::test]
    async fn show_with_reservations_cannot_be_deleted() {
        let store = MemoryStore::new();
        let show = store.create_show(&show_input("Dune")).await.unwrap();
        store.create_reservation(&reservation_input(show.id, "Alice")).await.unwrap();

        let err = store.delete_show(show.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(store.get_show(show.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reservation_for_unknown_show_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .create_reservation(&reservation_input(42, "Bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidReference { entity: "show", id: 42 }));
    }

    #[tokio::test]
    async fn reservations_follow_show_title_changes() {
        let store = MemoryStore::new();
        let show = store.create_show(&show_input("Dune")).await.unwrap();
        let reservation = store
            .create_reservation(&reservation_input(show.id, "Alice"))
            .await
            .unwrap();
        assert_eq!(reservation.show_movie_title, "Dune");

        store.update_show(show.id, &show_input("Dune: Part Two")).await.unwrap();
        let reservation = store.get_reservation(reservation.id).await.unwrap().unwrap();
        assert_eq!(reservation.show_movie_title, "Dune: Part Two");
    }

    #[tokio::test]
    async fn list_reservations_filters_and_orders_newest_first() {
        let store = MemoryStore::new();
        let dune = store.create_show(&show_input("Dune")).await.unwrap();
        let alien = store.create_show(&show_input("Alien")).await.unwrap();
        store.create_reservation(&reservation_input(dune.id, "Alice")).await.unwrap();
        store.create_reservation(&reservation_input(alien.id, "Bob")).await.unwrap();
        store.create_reservation(&reservation_input(dune.id, "Carol")).await.unwrap();

        let page = store
            .list_reservations(&ReservationQuery {
                show_id: Some(dune.id),
                search: vec![],
                ordering: ReservationQuery::DEFAULT_ORDERING.to_vec(),
                page: PageRequest::number(1, 10),
            })
            .await
            .unwrap();
        let names: Vec<&str> = page.items.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(page.total, 2);
        assert_eq!(names, vec!["Carol", "Alice"]);

        let page = store
            .list_reservations(&ReservationQuery {
                show_id: None,
                search: search_terms(Some("alien")),
                ordering: ReservationQuery::DEFAULT_ORDERING.to_vec(),
                page: PageRequest::number(1, 10),
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].customer_name, "Bob");
    }

    #[tokio::test]
    async fn documents_keep_insertion_order_and_reject_duplicates() {
        let store = MemoryStore::new();
        store.insert_document("movie_catalog", "b", &json!({"id": "b"})).await.unwrap();
        store.insert_document("movie_catalog", "a", &json!({"id": "a"})).await.unwrap();

        let err = store
            .insert_document("movie_catalog", "a", &json!({"id": "a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let docs = store.list_documents("movie_catalog").await.unwrap();
        assert_eq!(docs, vec![json!({"id": "b"}), json!({"id": "a"})]);
        assert!(store.list_documents("reservation_events").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replacing_or_deleting_missing_documents_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .replace_document("movie_catalog", "nope", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        store.insert_document("movie_catalog", "x", &json!({"v": 1})).await.unwrap();
        store.replace_document("movie_catalog", "x", &json!({"v": 2})).await.unwrap();
        assert_eq!(
            store.get_document("movie_catalog", "x").await.unwrap(),
            Some(json!({"v": 2}))
        );
        store.delete_document("movie_catalog", "x").await.unwrap();
        assert!(matches!(
            store.delete_document("movie_catalog", "x").await.unwrap_err(),
            CoreError::NotFound(_)
        ));
    }
}

use std::sync::Arc;

use cinema_core::{DocumentStore, ReservationRepository, ShowRepository};
use cinema_store::MemoryStore;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub shows: Arc<dyn ShowRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub documents: Arc<dyn DocumentStore>,
    pub auth: AuthConfig,
    pub page_size: u64,
}

impl AppState {
    /// All three stores backed by one shared in-process [`MemoryStore`].
    pub fn in_memory(auth: AuthConfig, page_size: u64) -> Self {
        let store = MemoryStore::new();
        Self {
            shows: Arc::new(store.clone()),
            reservations: Arc::new(store.clone()),
            documents: Arc::new(store),
            auth,
            page_size,
        }
    }
}

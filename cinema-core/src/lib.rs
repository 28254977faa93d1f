pub mod catalog;
pub mod events;
pub mod query;
pub mod repository;
pub mod reservation;
pub mod show;

pub use catalog::MovieCatalog;
pub use events::{EventSource, EventType, ReservationEvent};
pub use query::{OrderKey, Page, PageRequest, ReservationQuery, ShowQuery};
pub use repository::{Document, DocumentStore, ReservationRepository, ShowRepository};
pub use reservation::{Reservation, ReservationInput, ReservationStatus};
pub use show::{Show, ShowInput};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A write named a related record that does not exist.
    #[error("Invalid reference to {entity} {id}")]
    InvalidReference { entity: &'static str, id: i64 },
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl CoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        CoreError::Backend(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

use serde::{Deserialize, Serialize};

use crate::repository::Document;

/// A movie entry in the document-store catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieCatalog {
    pub id: String,
    pub movie_title: String,
    pub genre: String,
    pub duration_min: i32,
    pub rating: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Document for MovieCatalog {
    const COLLECTION: &'static str = "movie_catalog";

    fn id(&self) -> &str {
        &self.id
    }
}

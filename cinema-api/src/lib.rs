use axum::{
    http::{header, Method},
    middleware::from_fn_with_state,
    Router,
};
use cinema_core::{MovieCatalog, ReservationEvent};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod access;
pub mod documents;
pub mod error;
pub mod middleware;
pub mod pagination;
pub mod reservations;
pub mod serializers;
pub mod shows;
pub mod state;

pub use state::{AppState, AuthConfig};

/// Builds the HTTP application. Every route is mounted under `base_path`
/// when it is non-empty (`"api"` and `"/api/"` both mean `/api`).
pub fn app(state: AppState, base_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let api = Router::new()
        .merge(shows::routes())
        .merge(reservations::routes())
        .merge(documents::routes::<MovieCatalog>("/movie-catalog"))
        .merge(documents::routes::<ReservationEvent>("/reservation-events"));

    let base = base_path.trim_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{base}"), api)
    };

    router
        .layer(from_fn_with_state(state.clone(), middleware::identify_caller))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use cinema_core::query::{parse_ordering, search_terms};
use cinema_core::{PageRequest, Reservation, ReservationInput, ReservationQuery};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::access::{authorize, Action, Resource};
use crate::error::AppError;
use crate::middleware::Caller;
use crate::pagination::{page_number, paginate, Paginated};
use crate::serializers::{self, FieldErrors, WriteMode};
use crate::shows::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReservationListParams {
    pub show_id: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations/", get(list_reservations).post(create_reservation))
        .route(
            "/reservations/{id}/",
            get(get_reservation)
                .put(replace_reservation)
                .patch(update_reservation)
                .delete(delete_reservation),
        )
}

/// `?show_id=`; an empty value means no filter.
fn show_filter(raw: Option<&str>) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| FieldErrors::single("show_id", "Enter a number.").into()),
    }
}

async fn list_reservations(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ReservationListParams>,
) -> Result<Json<Paginated<Reservation>>, AppError> {
    authorize(&caller, Resource::Reservations, Action::List)?;
    let show_id = show_filter(params.show_id.as_deref())?;
    let number = page_number(params.page.as_deref())?;

    let query = ReservationQuery {
        show_id,
        search: search_terms(params.search.as_deref()),
        ordering: parse_ordering(params.ordering.as_deref(), &ReservationQuery::DEFAULT_ORDERING),
        page: PageRequest::number(number, state.page_size),
    };
    let page = state.reservations.list_reservations(&query).await?;

    Ok(Json(paginate(page, number, state.page_size, &uri)?))
}

async fn get_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Reservation>, AppError> {
    authorize(&caller, Resource::Reservations, Action::Retrieve)?;
    let id = parse_id(&id)?;

    let reservation = state
        .reservations
        .get_reservation(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(reservation))
}

async fn create_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    authorize(&caller, Resource::Reservations, Action::Create)?;
    let Json(body) = body?;

    let changes = serializers::parse_reservation(&body, WriteMode::Create, state.shows.as_ref()).await?;
    let reservation = state
        .reservations
        .create_reservation(&changes.apply(serializers::new_reservation()))
        .await?;

    info!(
        "Reservation created: {} for show {} ({} seats)",
        reservation.id, reservation.show_id, reservation.seats
    );
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn replace_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Reservation>, AppError> {
    authorize(&caller, Resource::Reservations, Action::Update)?;
    write_reservation(&state, &id, body, WriteMode::Replace).await
}

async fn update_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Reservation>, AppError> {
    authorize(&caller, Resource::Reservations, Action::PartialUpdate)?;
    write_reservation(&state, &id, body, WriteMode::Partial).await
}

async fn write_reservation(
    state: &AppState,
    id: &str,
    body: Result<Json<Value>, JsonRejection>,
    mode: WriteMode,
) -> Result<Json<Reservation>, AppError> {
    let id = parse_id(id)?;
    let current = state
        .reservations
        .get_reservation(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    let Json(body) = body?;

    let changes = serializers::parse_reservation(&body, mode, state.shows.as_ref()).await?;
    let reservation = state
        .reservations
        .update_reservation(id, &changes.apply(ReservationInput::from(&current)))
        .await?;

    if reservation.status != current.status {
        info!(
            "Reservation {} status {} -> {}",
            id, current.status, reservation.status
        );
    }
    Ok(Json(reservation))
}

async fn delete_reservation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    authorize(&caller, Resource::Reservations, Action::Destroy)?;
    let id = parse_id(&id)?;

    state.reservations.delete_reservation(id).await?;
    info!("Reservation deleted: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use cinema_core::query::{parse_ordering, search_terms};
use cinema_core::{PageRequest, Show, ShowInput, ShowQuery};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::access::{authorize, Action, Resource};
use crate::error::AppError;
use crate::middleware::Caller;
use crate::pagination::{page_number, paginate, Paginated};
use crate::serializers::{self, WriteMode};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ShowListParams {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/show/", get(list_shows).post(create_show))
        .route(
            "/show/{id}/",
            get(get_show).put(replace_show).patch(update_show).delete(delete_show),
        )
}

/// Path ids that are not integers name no record.
pub(crate) fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| AppError::not_found())
}

async fn list_shows(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ShowListParams>,
) -> Result<Json<Paginated<Show>>, AppError> {
    authorize(&caller, Resource::Shows, Action::List)?;
    let number = page_number(params.page.as_deref())?;

    let query = ShowQuery {
        search: search_terms(params.search.as_deref()),
        ordering: parse_ordering(params.ordering.as_deref(), &ShowQuery::DEFAULT_ORDERING),
        page: PageRequest::number(number, state.page_size),
    };
    let page = state.shows.list_shows(&query).await?;

    Ok(Json(paginate(page, number, state.page_size, &uri)?))
}

async fn get_show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Show>, AppError> {
    authorize(&caller, Resource::Shows, Action::Retrieve)?;
    let id = parse_id(&id)?;

    let show = state.shows.get_show(id).await?.ok_or_else(AppError::not_found)?;
    Ok(Json(show))
}

async fn create_show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Show>), AppError> {
    authorize(&caller, Resource::Shows, Action::Create)?;
    let Json(body) = body?;

    let input = serializers::parse_show(&body, WriteMode::Create)?.apply(serializers::new_show());
    let show = state.shows.create_show(&input).await?;

    info!("Show created: {} ({})", show.id, show.movie_title);
    Ok((StatusCode::CREATED, Json(show)))
}

async fn replace_show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Show>, AppError> {
    authorize(&caller, Resource::Shows, Action::Update)?;
    write_show(&state, &id, body, WriteMode::Replace).await
}

async fn update_show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Show>, AppError> {
    authorize(&caller, Resource::Shows, Action::PartialUpdate)?;
    write_show(&state, &id, body, WriteMode::Partial).await
}

async fn write_show(
    state: &AppState,
    id: &str,
    body: Result<Json<Value>, JsonRejection>,
    mode: WriteMode,
) -> Result<Json<Show>, AppError> {
    let id = parse_id(id)?;
    let current = state.shows.get_show(id).await?.ok_or_else(AppError::not_found)?;
    let Json(body) = body?;

    let input = serializers::parse_show(&body, mode)?.apply(ShowInput::from(&current));
    let show = state.shows.update_show(id, &input).await?;

    info!("Show updated: {}", show.id);
    Ok(Json(show))
}

async fn delete_show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    authorize(&caller, Resource::Shows, Action::Destroy)?;
    let id = parse_id(&id)?;

    if let Err(err) = state.shows.delete_show(id).await {
        warn!("Show {} not deleted: {}", id, err);
        return Err(err.into());
    }

    info!("Show deleted: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

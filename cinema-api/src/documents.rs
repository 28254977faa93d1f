//! CRUD over the document store, shared by every document collection.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use cinema_core::{Document, MovieCatalog, ReservationEvent};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::access::{authorize, Action, Resource};
use crate::error::AppError;
use crate::middleware::Caller;
use crate::serializers::{self, FieldErrors};
use crate::state::AppState;

/// A document type exposed over HTTP.
pub trait DocumentResource: Document {
    const RESOURCE: Resource;

    /// Full validation of a request body; `id` is already decided. On
    /// replace, `stored` supplies values for omitted optional fields.
    fn from_payload(id: String, body: &Value, stored: Option<&Self>) -> Result<Self, FieldErrors>;
}

impl DocumentResource for MovieCatalog {
    const RESOURCE: Resource = Resource::MovieCatalog;

    fn from_payload(id: String, body: &Value, stored: Option<&Self>) -> Result<Self, FieldErrors> {
        serializers::parse_movie_catalog(id, body, stored)
    }
}

impl DocumentResource for ReservationEvent {
    const RESOURCE: Resource = Resource::ReservationEvents;

    fn from_payload(id: String, body: &Value, stored: Option<&Self>) -> Result<Self, FieldErrors> {
        serializers::parse_reservation_event(id, body, stored)
    }
}

pub fn routes<D: DocumentResource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{path}/"), get(list_documents::<D>).post(create_document::<D>))
        .route(
            &format!("{path}/{{id}}/"),
            get(get_document::<D>)
                .put(replace_document::<D>)
                .delete(delete_document::<D>),
        )
}

fn decode<D: Document>(value: Value) -> Result<D, AppError> {
    serde_json::from_value(value).map_err(|e| {
        AppError::InternalServerError(format!("Stored {} document is malformed: {}", D::COLLECTION, e))
    })
}

fn encode<D: Document>(document: &D) -> Result<Value, AppError> {
    serde_json::to_value(document).map_err(|e| AppError::InternalServerError(e.to_string()))
}

async fn list_documents<D: DocumentResource>(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<D>>, AppError> {
    authorize(&caller, D::RESOURCE, Action::List)?;

    let documents = state
        .documents
        .list_documents(D::COLLECTION)
        .await?
        .into_iter()
        .map(decode::<D>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(documents))
}

async fn get_document<D: DocumentResource>(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<D>, AppError> {
    authorize(&caller, D::RESOURCE, Action::Retrieve)?;

    let value = state
        .documents
        .get_document(D::COLLECTION, &id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(decode(value)?))
}

async fn create_document<D: DocumentResource>(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<D>), AppError> {
    authorize(&caller, D::RESOURCE, Action::Create)?;
    let Json(body) = body?;

    let id = serializers::document_id(&body)?.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let document = D::from_payload(id, &body, None)?;
    state
        .documents
        .insert_document(D::COLLECTION, document.id(), &encode(&document)?)
        .await?;

    info!("Created {} document {}", D::COLLECTION, document.id());
    Ok((StatusCode::CREATED, Json(document)))
}

async fn replace_document<D: DocumentResource>(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<D>, AppError> {
    authorize(&caller, D::RESOURCE, Action::Update)?;
    let stored: D = state
        .documents
        .get_document(D::COLLECTION, &id)
        .await?
        .ok_or_else(AppError::not_found)
        .and_then(decode)?;
    let Json(body) = body?;

    // The path decides the id; any id in the body is ignored.
    let document = D::from_payload(id, &body, Some(&stored))?;
    state
        .documents
        .replace_document(D::COLLECTION, document.id(), &encode(&document)?)
        .await?;

    info!("Replaced {} document {}", D::COLLECTION, document.id());
    Ok(Json(document))
}

async fn delete_document<D: DocumentResource>(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    authorize(&caller, D::RESOURCE, Action::Destroy)?;

    state.documents.delete_document(D::COLLECTION, &id).await?;
    info!("Deleted {} document {}", D::COLLECTION, id);
    Ok(StatusCode::NO_CONTENT)
}

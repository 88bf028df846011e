use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::storage::StorageClient;

use super::dto::{parse_data_url, CreateMealBase64, HistoryFilter, MealResponse};
use super::{repo, services};

const PRESIGN_TTL_SECS: u64 = 10 * 60;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_history))
        .route("/meals/today", get(list_today))
        .route("/meals/:id/photo", get(get_photo))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal_multipart))
        .route("/meals/base64", post(create_meal_base64))
        .route("/meals/:id", delete(delete_meal))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /meals (multipart, single `file` field)
#[instrument(skip(state, mp))]
async fn create_meal_multipart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<MealResponse>), AppError> {
    let mut file: Option<(Bytes, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("unreadable upload: {e}")))?;
            file = Some((data, content_type));
            break;
        }
    }
    let (image, content_type) =
        file.ok_or_else(|| AppError::Validation("file field is required".into()))?;

    let entry = services::ingest(&state, user_id, image, &content_type).await?;
    Ok(created_response(entry))
}

/// POST /meals/base64
#[instrument(skip(state, body))]
async fn create_meal_base64(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMealBase64>,
) -> Result<(StatusCode, HeaderMap, Json<MealResponse>), AppError> {
    let (content_type, payload) = match parse_data_url(&body.image_b64) {
        Some((mt, payload)) => (mt.to_string(), payload),
        None => (
            body.content_type
                .clone()
                .unwrap_or_else(|| "image/jpeg".into()),
            body.image_b64.as_str(),
        ),
    };
    let bytes = BASE64
        .decode(payload)
        .map_err(|_| AppError::Validation("invalid base64 image".into()))?;

    let entry = services::ingest(&state, user_id, Bytes::from(bytes), &content_type).await?;
    Ok(created_response(entry))
}

fn created_response(entry: repo::MealEntry) -> (StatusCode, HeaderMap, Json<MealResponse>) {
    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/meals/{}", entry.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    (StatusCode::CREATED, headers, Json(MealResponse::from(entry)))
}

/// GET /meals?search=&sort=&limit=&offset=
#[instrument(skip(state))]
async fn list_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(filter): Query<HistoryFilter>,
) -> Result<Json<Vec<MealResponse>>, AppError> {
    let meals = repo::list_history(&state.db, user_id, &filter)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(meals.into_iter().map(MealResponse::from).collect()))
}

/// GET /meals/today
#[instrument(skip(state))]
async fn list_today(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<MealResponse>>, AppError> {
    let today = OffsetDateTime::now_utc().date();
    let meals = repo::list_for_day(&state.db, user_id, today)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(meals.into_iter().map(MealResponse::from).collect()))
}

/// GET /meals/:id/photo — 302 to a presigned object URL.
#[instrument(skip(state))]
async fn get_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = repo::find_meal(&state.db, user_id, id)
        .await
        .map_err(AppError::Internal)?
        .ok_or(AppError::NotFound("meal"))?;
    let url = state
        .storage
        .presign_get(&entry.image_key, PRESIGN_TTL_SECS)
        .await
        .map_err(AppError::Internal)?;
    Ok(Redirect::temporary(&url))
}

/// DELETE /meals/:id
#[instrument(skip(state))]
async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::remove_meal(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

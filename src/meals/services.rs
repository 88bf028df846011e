use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::profile;
use crate::state::AppState;
use crate::storage::{meal_image_key, StorageClient};
use crate::vision::{validate_image, DishIdentifier};

use super::repo::{self, MealEntry};

/// Ingestion pipeline for one meal photo:
/// upload -> identify -> append -> streak refresh.
///
/// Each step surfaces its own error kind unchanged and nothing is written
/// before identification succeeds, so a failure never leaves a
/// half-identified meal behind. A failure after the upload leaves the
/// stored object orphaned; that is accepted and cleaned up externally.
pub async fn ingest(
    state: &AppState,
    user_id: Uuid,
    image: Bytes,
    content_type: &str,
) -> Result<MealEntry, AppError> {
    validate_image(&image, content_type)?;

    let image_key = meal_image_key(user_id, content_type);
    state
        .storage
        .put_object(&image_key, image.clone(), content_type)
        .await
        .map_err(AppError::Storage)?;

    let record = state.vision.identify(image, content_type).await?;

    let entry = repo::insert_meal(&state.db, user_id, &record, &image_key)
        .await
        .context("append meal entry")?;
    info!(
        user_id = %user_id,
        meal_id = %entry.id,
        dish = %entry.dish_name,
        calories = entry.calories,
        "meal ingested"
    );

    // Same recomputation entry point the dashboard data-load uses.
    profile::services::refresh_streak(state, user_id)
        .await
        .context("refresh streak after ingestion")?;

    Ok(entry)
}

/// Hard delete of a meal and (best effort) its stored image. The streak
/// is not re-evaluated: a day already credited stays credited even if the
/// deletion drops it below goal.
pub async fn remove_meal(state: &AppState, user_id: Uuid, meal_id: Uuid) -> Result<(), AppError> {
    let entry = repo::find_meal(&state.db, user_id, meal_id)
        .await
        .context("load meal for deletion")?
        .ok_or(AppError::NotFound("meal"))?;

    if !repo::delete_meal(&state.db, user_id, meal_id)
        .await
        .context("delete meal entry")?
    {
        return Err(AppError::NotFound("meal"));
    }

    if let Err(e) = state.storage.delete_object(&entry.image_key).await {
        warn!(error = %e, key = %entry.image_key, "meal image left behind in storage");
    }
    info!(user_id = %user_id, meal_id = %meal_id, "meal deleted");
    Ok(())
}

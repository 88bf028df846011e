use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::meals;
use crate::state::AppState;

use super::repo::{self, Profile, ProfileUpdate};
use super::services::{self, DayTotal};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/trend", get(get_trend))
        .route("/dashboard", get(get_dashboard))
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    user_id: Uuid,
    name: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    weight: Option<f64>,
    height: Option<f64>,
    daily_calorie_goal: i32,
    streak_count: i32,
    longest_streak: i32,
    last_streak_check: Option<Date>,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            user_id: p.user_id,
            name: p.name,
            age: p.age,
            gender: p.gender,
            weight: p.weight,
            height: p.height,
            daily_calorie_goal: p.daily_calorie_goal,
            streak_count: p.streak_count,
            longest_streak: p.longest_streak,
            last_streak_check: p.last_streak_check,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    name: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    weight: Option<f64>,
    height: Option<f64>,
    daily_calorie_goal: Option<i32>,
}

/// Today's intake against the goal plus the streak counters — the
/// data-load behind the home screen, and the call that triggers the daily
/// streak evaluation.
#[derive(Debug, Serialize)]
struct DashboardResponse {
    today_calories: i64,
    daily_calorie_goal: i32,
    streak_count: i32,
    longest_streak: i32,
    name: Option<String>,
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = repo::get_or_create(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state, body))]
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    if let Some(goal) = body.daily_calorie_goal {
        if goal <= 0 {
            return Err(AppError::Validation(
                "daily_calorie_goal must be positive".into(),
            ));
        }
    }
    if let Some(age) = body.age {
        if age < 0 {
            return Err(AppError::Validation("age must be non-negative".into()));
        }
    }

    // Ensure the row exists before the partial update.
    repo::get_or_create(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?;
    let profile = repo::update_profile(
        &state.db,
        user_id,
        &ProfileUpdate {
            name: body.name,
            age: body.age,
            gender: body.gender,
            weight: body.weight,
            height: body.height,
            daily_calorie_goal: body.daily_calorie_goal,
        },
    )
    .await
    .map_err(AppError::Internal)?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state))]
async fn get_trend(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<DayTotal>>, AppError> {
    let series = services::seven_day_trend(&state, user_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(series))
}

#[instrument(skip(state))]
async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let profile = services::refresh_streak(&state, user_id)
        .await
        .map_err(AppError::Internal)?;
    let today = OffsetDateTime::now_utc().date();
    let today_calories = meals::repo::daily_total(&state.db, user_id, today)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(DashboardResponse {
        today_calories,
        daily_calorie_goal: profile.daily_calorie_goal,
        streak_count: profile.streak_count,
        longest_streak: profile.longest_streak,
        name: profile.name,
    }))
}

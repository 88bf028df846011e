use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::streak::StreakState;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub daily_calorie_goal: i32,
    pub streak_count: i32,
    pub longest_streak: i32,
    pub last_streak_check: Option<Date>,
    pub created_at: OffsetDateTime,
}

impl Profile {
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            streak_count: self.streak_count,
            longest_streak: self.longest_streak,
            last_streak_check: self.last_streak_check,
            daily_calorie_goal: self.daily_calorie_goal,
        }
    }
}

/// Profiles are created lazily on first authenticated access, since
/// signup happens at the external auth provider.
pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<Profile> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await
    .context("ensure profile row")?;

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT user_id, name, age, gender, weight, height, daily_calorie_goal,
               streak_count, longest_streak, last_streak_check, created_at
        FROM profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("load profile")?;
    Ok(profile)
}

pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub daily_calorie_goal: Option<i32>,
}

/// Partial update; absent fields keep their stored value.
pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    up: &ProfileUpdate,
) -> anyhow::Result<Profile> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
           SET name = COALESCE($2, name),
               age = COALESCE($3, age),
               gender = COALESCE($4, gender),
               weight = COALESCE($5, weight),
               height = COALESCE($6, height),
               daily_calorie_goal = COALESCE($7, daily_calorie_goal)
         WHERE user_id = $1
        RETURNING user_id, name, age, gender, weight, height, daily_calorie_goal,
                  streak_count, longest_streak, last_streak_check, created_at
        "#,
    )
    .bind(user_id)
    .bind(up.name.as_deref())
    .bind(up.age)
    .bind(up.gender.as_deref())
    .bind(up.weight)
    .bind(up.height)
    .bind(up.daily_calorie_goal)
    .fetch_one(db)
    .await
    .context("update profile")?;
    Ok(profile)
}

/// Persist an evaluated streak. The WHERE clause makes the per-row update
/// the serialization point: a concurrent session that already stamped
/// today (or later) turns this into a no-op, and `last_streak_check`
/// can only move forward. Returns whether the row was written.
pub async fn update_streak(db: &PgPool, user_id: Uuid, s: &StreakState) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
           SET streak_count = $2,
               longest_streak = GREATEST(longest_streak, $3),
               last_streak_check = $4
         WHERE user_id = $1
           AND (last_streak_check IS NULL OR last_streak_check < $4)
        "#,
    )
    .bind(user_id)
    .bind(s.streak_count)
    .bind(s.longest_streak)
    .bind(s.last_streak_check)
    .execute(db)
    .await
    .context("update streak")?;
    Ok(result.rows_affected() > 0)
}

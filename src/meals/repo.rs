use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::vision::NutritionRecord;

use super::dto::{HistoryFilter, HistorySort};

/// One recorded meal. Immutable after insert; the only mutation is a hard
/// delete by the owning user.
#[derive(Debug, Clone, FromRow)]
pub struct MealEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dish_name: String,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub confidence: f64,
    pub image_key: String,
    pub created_at: OffsetDateTime,
}

const MEAL_COLUMNS: &str = "id, user_id, dish_name, calories, protein_g, carbs_g, fat_g, confidence, image_key, created_at";

pub async fn insert_meal(
    db: &PgPool,
    user_id: Uuid,
    rec: &NutritionRecord,
    image_key: &str,
) -> anyhow::Result<MealEntry> {
    let entry = sqlx::query_as::<_, MealEntry>(
        r#"
        INSERT INTO meals (user_id, dish_name, calories, protein_g, carbs_g, fat_g, confidence, image_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, user_id, dish_name, calories, protein_g, carbs_g, fat_g, confidence, image_key, created_at
        "#,
    )
    .bind(user_id)
    .bind(&rec.dish_name)
    .bind(rec.calories)
    .bind(rec.protein_g)
    .bind(rec.carbs_g)
    .bind(rec.fat_g)
    .bind(rec.confidence)
    .bind(image_key)
    .fetch_one(db)
    .await
    .context("insert meal")?;
    Ok(entry)
}

/// Half-open UTC window for one calendar day: start-of-day inclusive,
/// next start-of-day exclusive.
pub fn day_bounds(day: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.midnight().assume_utc();
    (start, start + Duration::days(1))
}

pub async fn daily_total(db: &PgPool, user_id: Uuid, day: Date) -> anyhow::Result<i64> {
    let (start, end) = day_bounds(day);
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT SUM(calories)::bigint
        FROM meals
        WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(db)
    .await
    .context("sum daily calories")?;
    Ok(total.unwrap_or(0))
}

/// Per-day calorie sums inside `[start, end_exclusive)`; days without
/// meals produce no row, the caller zero-fills.
pub async fn daily_totals(
    db: &PgPool,
    user_id: Uuid,
    start: Date,
    end_exclusive: Date,
) -> anyhow::Result<Vec<(Date, i64)>> {
    let from = start.midnight().assume_utc();
    let to = end_exclusive.midnight().assume_utc();
    let rows = sqlx::query_as::<_, (Date, i64)>(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day, SUM(calories)::bigint AS total
        FROM meals
        WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
    .context("sum calories per day")?;
    Ok(rows)
}

pub async fn list_for_day(db: &PgPool, user_id: Uuid, day: Date) -> anyhow::Result<Vec<MealEntry>> {
    let (start, end) = day_bounds(day);
    let rows = sqlx::query_as::<_, MealEntry>(
        r#"
        SELECT id, user_id, dish_name, calories, protein_g, carbs_g, fat_g, confidence, image_key, created_at
        FROM meals
        WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
    .context("list meals for day")?;
    Ok(rows)
}

pub async fn list_history(
    db: &PgPool,
    user_id: Uuid,
    filter: &HistoryFilter,
) -> anyhow::Result<Vec<MealEntry>> {
    let order = match filter.sort {
        HistorySort::Recent => "created_at DESC",
        HistorySort::Oldest => "created_at ASC",
        HistorySort::Highest => "calories DESC, created_at DESC",
        HistorySort::Lowest => "calories ASC, created_at DESC",
    };
    let sql = format!(
        r#"
        SELECT {MEAL_COLUMNS}
        FROM meals
        WHERE user_id = $1
          AND ($2::text IS NULL OR dish_name ILIKE '%' || $2 || '%')
        ORDER BY {order}
        LIMIT $3 OFFSET $4
        "#
    );
    let rows = sqlx::query_as::<_, MealEntry>(&sql)
        .bind(user_id)
        .bind(filter.search.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(db)
        .await
        .context("list meal history")?;
    Ok(rows)
}

pub async fn find_meal(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
) -> anyhow::Result<Option<MealEntry>> {
    let row = sqlx::query_as::<_, MealEntry>(
        r#"
        SELECT id, user_id, dish_name, calories, protein_g, carbs_g, fat_g, confidence, image_key, created_at
        FROM meals
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find meal")?;
    Ok(row)
}

/// Hard delete, scoped to the owner. Returns false when nothing matched,
/// which the API surfaces as NotFound.
pub async fn delete_meal(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM meals WHERE id = $1 AND user_id = $2"#)
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal")?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn day_window_is_half_open() {
        let (start, end) = day_bounds(date!(2026 - 08 - 05));
        assert_eq!(start, datetime!(2026 - 08 - 05 00:00:00 UTC));
        assert_eq!(end, datetime!(2026 - 08 - 06 00:00:00 UTC));

        // 23:59:59 of day D belongs to D, next midnight does not.
        let last_second = datetime!(2026 - 08 - 05 23:59:59 UTC);
        assert!(last_second >= start && last_second < end);
        let next_midnight = datetime!(2026 - 08 - 06 00:00:00 UTC);
        assert!(!(next_midnight < end));
    }

    #[test]
    fn start_of_day_is_inclusive() {
        let (start, end) = day_bounds(date!(2026 - 08 - 05));
        let midnight = datetime!(2026 - 08 - 05 00:00:00 UTC);
        assert!(midnight >= start && midnight < end);
    }
}

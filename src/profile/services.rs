use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::meals;
use crate::state::AppState;

use super::repo::{self, Profile};
use super::streak;

/// Single entry point for streak recomputation, used both after an
/// ingestion and on dashboard data-load. Safe to call any number of times
/// per day: the engine's same-day guard plus the conditional row update
/// keep the evaluation to one effective run per user per calendar day.
pub async fn refresh_streak(state: &AppState, user_id: Uuid) -> anyhow::Result<Profile> {
    let mut profile = repo::get_or_create(&state.db, user_id).await?;
    let today = OffsetDateTime::now_utc().date();
    if profile.last_streak_check == Some(today) {
        return Ok(profile);
    }

    let today_total = meals::repo::daily_total(&state.db, user_id, today).await?;
    let yesterday_total = match today.previous_day() {
        Some(d) => meals::repo::daily_total(&state.db, user_id, d).await?,
        None => 0,
    };

    let current = profile.streak_state();
    let next = streak::evaluate(&current, today_total, yesterday_total, today);
    if next != current {
        if repo::update_streak(&state.db, user_id, &next).await? {
            info!(
                user_id = %user_id,
                streak = next.streak_count,
                longest = next.longest_streak,
                "streak state persisted"
            );
            profile.streak_count = next.streak_count;
            profile.longest_streak = profile.longest_streak.max(next.longest_streak);
            profile.last_streak_check = next.last_streak_check;
        } else {
            // A concurrent session won the row update; its result stands.
            profile = repo::get_or_create(&state.db, user_id).await?;
        }
    }
    Ok(profile)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DayTotal {
    pub day: Date,
    pub calories: i64,
}

/// Trailing 7-day calorie series ending today, zero-filled for days
/// without meals.
pub async fn seven_day_trend(state: &AppState, user_id: Uuid) -> anyhow::Result<Vec<DayTotal>> {
    let today = OffsetDateTime::now_utc().date();
    let start = today - Duration::days(6);
    let end_exclusive = today + Duration::days(1);
    let rows = meals::repo::daily_totals(&state.db, user_id, start, end_exclusive).await?;
    Ok(fill_window(start, 7, &rows))
}

fn fill_window(start: Date, days: usize, rows: &[(Date, i64)]) -> Vec<DayTotal> {
    (0..days)
        .map(|i| {
            let day = start + Duration::days(i as i64);
            let calories = rows
                .iter()
                .find(|(d, _)| *d == day)
                .map(|(_, total)| *total)
                .unwrap_or(0);
            DayTotal { day, calories }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn fill_window_zero_fills_missing_days() {
        let rows = vec![
            (date!(2026 - 08 - 01), 1800),
            (date!(2026 - 08 - 03), 2400),
        ];
        let series = fill_window(date!(2026 - 07 - 31), 7, &rows);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0], DayTotal { day: date!(2026 - 07 - 31), calories: 0 });
        assert_eq!(series[1], DayTotal { day: date!(2026 - 08 - 01), calories: 1800 });
        assert_eq!(series[2], DayTotal { day: date!(2026 - 08 - 02), calories: 0 });
        assert_eq!(series[3], DayTotal { day: date!(2026 - 08 - 03), calories: 2400 });
        assert_eq!(series[6], DayTotal { day: date!(2026 - 08 - 06), calories: 0 });
    }

    #[test]
    fn fill_window_preserves_day_order() {
        let series = fill_window(date!(2026 - 08 - 01), 3, &[]);
        let days: Vec<Date> = series.iter().map(|t| t.day).collect();
        assert_eq!(
            days,
            vec![
                date!(2026 - 08 - 01),
                date!(2026 - 08 - 02),
                date!(2026 - 08 - 03)
            ]
        );
    }
}

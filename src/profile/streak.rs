use time::Date;
use tracing::debug;

/// Streak fields of a user profile, evaluated at most once per calendar
/// day. `longest_streak >= streak_count` and `last_streak_check` never
/// moves backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakState {
    pub streak_count: i32,
    pub longest_streak: i32,
    pub last_streak_check: Option<Date>,
    pub daily_calorie_goal: i32,
}

/// One step of the daily streak state machine.
///
/// The caller drives this on every data-load rather than from a timer, so
/// the function must tolerate being called redundantly within a day (the
/// equality guard) and arbitrarily late (the gap branch resets once no
/// matter how many days were skipped). A completed day is judged by
/// yesterday's total; today's total is still in flight and only logged.
pub fn evaluate(
    state: &StreakState,
    today_total: i64,
    yesterday_total: i64,
    today: Date,
) -> StreakState {
    if state.last_streak_check == Some(today) {
        return state.clone();
    }

    let mut next = state.clone();
    let yesterday = today.previous_day();
    match state.last_streak_check {
        Some(last) if last > today => {
            // A check recorded in the future means clock skew between
            // sessions; moving last_streak_check backwards would break
            // monotonicity, so leave the state alone.
            return state.clone();
        }
        Some(last) if Some(last) == yesterday => {
            if yesterday_total >= i64::from(state.daily_calorie_goal) {
                next.streak_count += 1;
                next.longest_streak = next.longest_streak.max(next.streak_count);
            } else {
                next.streak_count = 0;
            }
        }
        // One or more days were never evaluated at all.
        Some(_) => next.streak_count = 0,
        // First run: day zero of tracking, nothing to judge yet.
        None => {}
    }
    next.last_streak_check = Some(today);

    debug!(
        today_total,
        yesterday_total,
        streak = next.streak_count,
        longest = next.longest_streak,
        "streak evaluated"
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn state(
        streak_count: i32,
        longest_streak: i32,
        last_streak_check: Option<Date>,
    ) -> StreakState {
        StreakState {
            streak_count,
            longest_streak,
            last_streak_check,
            daily_calorie_goal: 2000,
        }
    }

    #[test]
    fn same_day_reentry_is_idempotent() {
        let today = date!(2026 - 08 - 06);
        let s = state(3, 5, Some(date!(2026 - 08 - 05)));
        let once = evaluate(&s, 800, 2100, today);
        let twice = evaluate(&once, 1600, 2100, today);
        assert_eq!(once, twice);
        assert_eq!(once.streak_count, 4);
    }

    #[test]
    fn continuation_increments_when_yesterday_met_goal() {
        let s = state(3, 3, Some(date!(2026 - 08 - 05)));
        let next = evaluate(&s, 0, 2100, date!(2026 - 08 - 06));
        assert_eq!(next.streak_count, 4);
        assert_eq!(next.longest_streak, 4);
        assert_eq!(next.last_streak_check, Some(date!(2026 - 08 - 06)));
    }

    #[test]
    fn goal_exactly_met_counts() {
        let s = state(1, 1, Some(date!(2026 - 08 - 05)));
        let next = evaluate(&s, 0, 2000, date!(2026 - 08 - 06));
        assert_eq!(next.streak_count, 2);
    }

    #[test]
    fn missed_goal_resets_but_keeps_longest() {
        let s = state(5, 5, Some(date!(2026 - 08 - 05)));
        let next = evaluate(&s, 0, 1500, date!(2026 - 08 - 06));
        assert_eq!(next.streak_count, 0);
        assert_eq!(next.longest_streak, 5);
        assert_eq!(next.last_streak_check, Some(date!(2026 - 08 - 06)));
    }

    #[test]
    fn gap_of_any_length_resets() {
        let s = state(7, 9, Some(date!(2026 - 08 - 03)));
        let next = evaluate(&s, 0, 5000, date!(2026 - 08 - 06));
        assert_eq!(next.streak_count, 0);
        assert_eq!(next.longest_streak, 9);
        assert_eq!(next.last_streak_check, Some(date!(2026 - 08 - 06)));
    }

    #[test]
    fn first_run_only_stamps_the_date() {
        let s = state(0, 0, None);
        let next = evaluate(&s, 900, 0, date!(2026 - 08 - 06));
        assert_eq!(next.streak_count, 0);
        assert_eq!(next.longest_streak, 0);
        assert_eq!(next.last_streak_check, Some(date!(2026 - 08 - 06)));
    }

    #[test]
    fn future_check_date_is_left_untouched() {
        let s = state(2, 2, Some(date!(2026 - 08 - 07)));
        let next = evaluate(&s, 0, 2500, date!(2026 - 08 - 06));
        assert_eq!(next, s);
    }

    #[test]
    fn longest_streak_never_decreases_over_a_sequence() {
        let mut s = state(0, 0, None);
        let mut day = date!(2026 - 07 - 01);
        let totals = [2100, 2200, 1000, 2500, 2500, 2500, 1999, 2000];
        let mut max_seen = 0;
        for total in totals {
            let next_day = day.next_day().expect("valid date");
            // `total` becomes yesterday's total on the following day.
            s = evaluate(&s, 0, total, next_day);
            assert!(s.longest_streak >= max_seen, "longest_streak decreased");
            assert!(s.longest_streak >= s.streak_count);
            max_seen = s.longest_streak;
            day = next_day;
        }
        assert_eq!(s.longest_streak, 3);
    }
}

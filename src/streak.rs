//! Streak computation over completion histories.
//!
//! Everything in this module is pure: it operates on an already-fetched
//! snapshot of completion events and returns fresh values. Callers re-run it
//! on the full snapshot whenever the snapshot changes.
//!
//! # Semantics
//!
//! Completion timestamps are reduced to calendar days in a caller-chosen time
//! zone. Same-day completions count once. A streak is a run of calendar days
//! with a difference of exactly one day between neighbours.
//!
//! The current streak is the run ending at the *latest* completion day in the
//! data. It is not reset when that day lies in the past, so a habit last done
//! a month ago still reports the length of its final run.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::model::{CompletionEvent, Habit, RankedHabit, StreakStats};

/// Number of habits shown on the leaderboard podium.
pub const PODIUM_SIZE: usize = 3;

/// Reduce a timestamp to its calendar day in `tz`.
pub fn calendar_day<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Compute streak statistics for `habit_id` using the local calendar day.
///
/// `completions` may contain events for any number of habits; only those
/// belonging to `habit_id` are considered.
pub fn compute_streak(habit_id: &str, completions: &[CompletionEvent]) -> StreakStats {
    compute_streak_in(habit_id, completions, &Local)
}

/// Compute streak statistics for `habit_id` with day boundaries taken in `tz`.
///
/// The result does not depend on the order of `completions`.
pub fn compute_streak_in<Tz: TimeZone>(
    habit_id: &str,
    completions: &[CompletionEvent],
    tz: &Tz,
) -> StreakStats {
    let days: BTreeSet<NaiveDate> = completions
        .iter()
        .filter(|c| c.habit_id == habit_id)
        .map(|c| calendar_day(&c.completed_at, tz))
        .collect();

    streak_over_days(&days)
}

/// Scan a set of distinct days in ascending order.
fn streak_over_days(days: &BTreeSet<NaiveDate>) -> StreakStats {
    let mut iter = days.iter();
    let Some(first) = iter.next() else {
        return StreakStats::default();
    };

    let mut current_streak = 1u32;
    let mut best_streak = 1u32;
    let mut previous = *first;

    for &day in iter {
        let gap = (day - previous).num_days();

        if gap == 1 {
            current_streak += 1;
            best_streak = best_streak.max(current_streak);
        } else if gap > 1 {
            current_streak = 1;
        }

        previous = day;
    }

    StreakStats {
        current_streak,
        best_streak,
        total_days: u32::try_from(days.len()).unwrap_or(u32::MAX),
    }
}

/// Pair every habit with its statistics, keeping the input order.
pub fn stats_for_habits<Tz: TimeZone>(
    habits: Vec<Habit>,
    completions: &[CompletionEvent],
    tz: &Tz,
) -> Vec<(Habit, StreakStats)> {
    habits
        .into_iter()
        .map(|habit| {
            let stats = compute_streak_in(&habit.id, completions, tz);
            (habit, stats)
        })
        .collect()
}

/// Order habits by best streak, highest first.
///
/// Habits with equal best streaks keep their relative input order.
pub fn rank_habits<I>(habits_with_stats: I) -> Vec<RankedHabit>
where
    I: IntoIterator<Item = (Habit, StreakStats)>,
{
    let mut ranked: Vec<RankedHabit> = habits_with_stats
        .into_iter()
        .map(|(habit, stats)| RankedHabit { habit, stats })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.stats.best_streak.cmp(&a.stats.best_streak));
    ranked
}

/// The first `n` entries of an already ranked list.
pub fn leaderboard_top(ranked: &[RankedHabit], n: usize) -> Vec<RankedHabit> {
    ranked.iter().take(n).cloned().collect()
}

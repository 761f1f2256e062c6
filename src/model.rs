//! Data models for habit tracking.
//!
//! Habits and completion events are the documents owned by the store. Streak
//! statistics and ranked habits are derived values: they are computed from a
//! snapshot of completion events and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often a habit is meant to be performed.
///
/// The label is informational only. Streaks are always counted in
/// consecutive calendar days regardless of frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// Parse a stored frequency label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            _ => None,
        }
    }
}

/// A habit owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Opaque document identifier.
    pub id: String,

    /// Owner of the habit.
    pub user_id: String,

    pub title: String,

    pub description: String,

    pub frequency: Frequency,

    /// Completion counter maintained by the tracker on every completion.
    ///
    /// This is a running tally, not a consecutive-day streak. Use
    /// [`crate::streak::compute_streak`] for streak figures.
    pub streak_count: u32,

    /// When the habit was last completed (creation time until the first completion).
    pub last_completed: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// One recorded instance of a habit being done.
///
/// Completion events are immutable once created. Only the calendar day of
/// `completed_at` matters for streak purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: String,

    /// The habit this completion belongs to.
    pub habit_id: String,

    pub user_id: String,

    pub completed_at: DateTime<Utc>,
}

/// Streak statistics for one habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakStats {
    /// Length of the consecutive-day run ending at the latest completion day.
    ///
    /// This is not anchored to today: a run that ended weeks ago is still
    /// reported at its full length.
    pub current_streak: u32,

    /// Longest consecutive-day run across the whole history.
    pub best_streak: u32,

    /// Number of distinct calendar days with at least one completion.
    pub total_days: u32,
}

/// A habit paired with its streak statistics, as shown on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHabit {
    pub habit: Habit,

    #[serde(flatten)]
    pub stats: StreakStats,
}

impl RankedHabit {
    /// Split back into the `(habit, stats)` pair accepted by
    /// [`crate::streak::rank_habits`].
    pub fn into_parts(self) -> (Habit, StreakStats) {
        (self.habit, self.stats)
    }
}

/// Fields supplied by a user when creating a habit.
#[derive(Debug, Clone, Deserialize)]
pub struct NewHabit {
    pub title: String,

    pub description: String,

    /// Defaults to daily.
    #[serde(default)]
    pub frequency: Frequency,
}

/// Request body for POST /habits.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHabitRequest {
    pub user_id: String,

    #[serde(flatten)]
    pub habit: NewHabit,
}

/// Request body for POST /habits/:id/complete.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteHabitRequest {
    pub user_id: String,
}

/// Query parameters identifying the acting user.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// Query parameters for GET /streaks.
#[derive(Debug, Deserialize)]
pub struct StreaksQuery {
    pub user_id: String,

    /// Number of habits to place on the podium (default: 3).
    #[serde(default = "default_top")]
    pub top: usize,
}

fn default_top() -> usize {
    3
}

/// Response for GET /habits/today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayResponse {
    /// Habits with at least one completion on the current calendar day.
    pub habit_ids: Vec<String>,
}

/// Response for GET /streaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreaksResponse {
    /// The leading habits by best streak.
    pub top: Vec<RankedHabit>,

    /// Every habit, ranked by best streak.
    pub habits: Vec<RankedHabit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parse() {
        assert_eq!(Frequency::parse("Daily"), Some(Frequency::Daily));
        assert_eq!(Frequency::parse("weekly"), Some(Frequency::Weekly));
        assert_eq!(Frequency::parse("MONTHLY"), Some(Frequency::Monthly));
        assert_eq!(Frequency::parse("hourly"), None);
    }

    #[test]
    fn test_frequency_round_trips_through_label() {
        for frequency in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly] {
            assert_eq!(Frequency::parse(frequency.as_str()), Some(frequency));
        }
    }

    #[test]
    fn test_create_request_defaults_to_daily() {
        let request: CreateHabitRequest = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "title": "Read",
            "description": "Ten pages"
        }))
        .unwrap();

        assert_eq!(request.habit.frequency, Frequency::Daily);
        assert_eq!(request.habit.title, "Read");
    }

    #[test]
    fn test_ranked_habit_flattens_stats() {
        let now = Utc::now();
        let ranked = RankedHabit {
            habit: Habit {
                id: "h1".to_string(),
                user_id: "u1".to_string(),
                title: "Run".to_string(),
                description: "5k".to_string(),
                frequency: Frequency::Weekly,
                streak_count: 4,
                last_completed: now,
                created_at: now,
            },
            stats: StreakStats {
                current_streak: 2,
                best_streak: 5,
                total_days: 9,
            },
        };

        let value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(value["best_streak"], 5);
        assert_eq!(value["habit"]["frequency"], "weekly");
    }
}

//! The habit tracker client.
//!
//! [`HabitTracker`] is the one handle the rest of the application uses to
//! reach the store. It is constructed explicitly at startup and cloned into
//! whatever needs it. Every write publishes a change event on the tracker's
//! [`ChangeFeed`].

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{CompletionEvent, Habit, NewHabit, RankedHabit};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind, Collection};
use crate::storage::Storage;
use crate::streak::{calendar_day, rank_habits, stats_for_habits};

/// Errors returned by tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The request was rejected before touching the store.
    #[error("invalid habit: {0}")]
    Validation(String),

    /// No habit with this id exists for the caller.
    #[error("habit not found: {0}")]
    HabitNotFound(String),

    /// The habit already has a completion on the current calendar day.
    #[error("habit already completed today: {0}")]
    AlreadyCompleted(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Client for habit and completion documents.
#[derive(Clone)]
pub struct HabitTracker {
    storage: Storage,
    feed: ChangeFeed,
    offset: FixedOffset,
}

impl HabitTracker {
    /// Create a tracker.
    ///
    /// # Arguments
    ///
    /// * `storage` - The document store
    /// * `feed` - Where change events are published
    /// * `offset` - UTC offset defining the calendar day for streaks and "today"
    pub fn new(storage: Storage, feed: ChangeFeed, offset: FixedOffset) -> Self {
        Self {
            storage,
            feed,
            offset,
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Create a habit for `user_id`.
    ///
    /// The habit starts with a zero counter and `last_completed` set to `now`.
    pub async fn create_habit(
        &self,
        user_id: &str,
        new_habit: NewHabit,
        now: DateTime<Utc>,
    ) -> Result<Habit> {
        let title = new_habit.title.trim();
        let description = new_habit.description.trim();

        if user_id.trim().is_empty() {
            return Err(TrackerError::Validation("user_id is required".to_string()));
        }
        if title.is_empty() {
            return Err(TrackerError::Validation("title is required".to_string()));
        }
        if description.is_empty() {
            return Err(TrackerError::Validation(
                "description is required".to_string(),
            ));
        }

        let habit = Habit {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            frequency: new_habit.frequency,
            streak_count: 0,
            last_completed: now,
            created_at: now,
        };

        self.storage.insert_habit(&habit).await?;

        info!(
            habit_id = %habit.id,
            frequency = habit.frequency.as_str(),
            "Habit created"
        );
        self.publish(Collection::Habits, ChangeKind::Create, &habit.id, user_id);

        Ok(habit)
    }

    pub async fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        Ok(self.storage.list_habits(user_id).await?)
    }

    /// Delete a habit and its completions.
    pub async fn delete_habit(&self, habit_id: &str) -> Result<()> {
        let user_id = self
            .storage
            .delete_habit(habit_id)
            .await?
            .ok_or_else(|| TrackerError::HabitNotFound(habit_id.to_string()))?;

        info!(habit_id = %habit_id, "Habit deleted");
        self.publish(Collection::Habits, ChangeKind::Delete, habit_id, &user_id);

        Ok(())
    }

    /// Mark a habit done at `now`.
    ///
    /// At most one completion per habit is accepted per calendar day. The
    /// store enforces this, so concurrent calls for the same day cannot both
    /// succeed.
    pub async fn complete_habit(
        &self,
        user_id: &str,
        habit_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompletionEvent> {
        self.storage
            .get_habit(habit_id)
            .await?
            .filter(|h| h.user_id == user_id)
            .ok_or_else(|| TrackerError::HabitNotFound(habit_id.to_string()))?;

        let completion = CompletionEvent {
            id: Uuid::new_v4().to_string(),
            habit_id: habit_id.to_string(),
            user_id: user_id.to_string(),
            completed_at: now,
        };
        let day = calendar_day(&now, &self.offset);

        if !self.storage.record_completion(&completion, day).await? {
            return Err(TrackerError::AlreadyCompleted(habit_id.to_string()));
        }

        info!(habit_id = %habit_id, day = %day, "Habit completed");
        self.publish(
            Collection::Completions,
            ChangeKind::Create,
            &completion.id,
            user_id,
        );
        self.publish(Collection::Habits, ChangeKind::Update, habit_id, user_id);

        Ok(completion)
    }

    /// Ids of habits with a completion on the calendar day containing `now`.
    pub async fn completed_today(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<String>> {
        let start = self.start_of_day(now);
        let completions = self
            .storage
            .list_completions_between(user_id, start, start + Duration::days(1))
            .await?;

        let mut habit_ids: Vec<String> = Vec::with_capacity(completions.len());
        for completion in completions {
            if !habit_ids.contains(&completion.habit_id) {
                habit_ids.push(completion.habit_id);
            }
        }

        Ok(habit_ids)
    }

    /// Fetch a user's full snapshot and rank their habits by best streak.
    pub async fn streak_board(&self, user_id: &str) -> Result<Vec<RankedHabit>> {
        let habits = self.storage.list_habits(user_id).await?;
        let completions = self.storage.list_completions(user_id).await?;

        debug!(
            habits = habits.len(),
            completions = completions.len(),
            "Computing streak board"
        );

        Ok(rank_habits(stats_for_habits(
            habits,
            &completions,
            &self.offset,
        )))
    }

    /// Start of the calendar day containing `now`, in UTC.
    fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = calendar_day(&now, &self.offset).and_time(NaiveTime::MIN);
        (midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }

    fn publish(&self, collection: Collection, kind: ChangeKind, document_id: &str, user_id: &str) {
        self.feed.publish(ChangeEvent {
            collection,
            kind,
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
        });
    }
}

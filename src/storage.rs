//! SQLite storage layer for habits and completions.
//!
//! The schema holds two document collections:
//!
//! - `habits`: one row per habit, owned by a user
//! - `completions`: one row per completion event, referencing a habit
//!
//! Timestamps are stored as unix seconds. Each completion also stores the
//! calendar day it counts for; a habit has at most one completion per day.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::model::{CompletionEvent, Frequency, Habit};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:habits.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let mut options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            // Every in-memory connection is a separate database; keep exactly one alive.
            options = options
                .max_connections(1)
                .idle_timeout(None::<std::time::Duration>)
                .max_lifetime(None::<std::time::Duration>);
        }

        let pool = options.connect(database_url).await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS habits (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                frequency TEXT NOT NULL,
                streak_count INTEGER NOT NULL DEFAULT 0,
                last_completed INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS completions (
                id TEXT PRIMARY KEY,
                habit_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                day TEXT NOT NULL,
                completed_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_habits_user
            ON habits(user_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Per-user scans; the unique index below enforces one completion per day
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_completions_user_ts
            ON completions(user_id, completed_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_completions_habit_day
            ON completions(habit_id, day)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new habit.
    pub async fn insert_habit(&self, habit: &Habit) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO habits
                (id, user_id, title, description, frequency, streak_count, last_completed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&habit.id)
        .bind(&habit.user_id)
        .bind(&habit.title)
        .bind(&habit.description)
        .bind(habit.frequency.as_str())
        .bind(i64::from(habit.streak_count))
        .bind(habit.last_completed.timestamp())
        .bind(habit.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a habit by id.
    ///
    /// # Returns
    ///
    /// The habit, or None if no habit has this id.
    pub async fn get_habit(&self, id: &str) -> anyhow::Result<Option<Habit>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, description, frequency, streak_count, last_completed, created_at
            FROM habits
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(habit_from_row).transpose()
    }

    /// List a user's habits, oldest first.
    pub async fn list_habits(&self, user_id: &str) -> anyhow::Result<Vec<Habit>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, description, frequency, streak_count, last_completed, created_at
            FROM habits
            WHERE user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(habit_from_row).collect()
    }

    /// Delete a habit together with its completions.
    ///
    /// # Returns
    ///
    /// The owner of the deleted habit, or None if no habit has this id.
    pub async fn delete_habit(&self, id: &str) -> anyhow::Result<Option<String>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM completions WHERE habit_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let owner: Option<String> =
            sqlx::query_scalar("DELETE FROM habits WHERE id = ? RETURNING user_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(owner)
    }

    /// Record a completion for `day` and bump the habit's counter.
    ///
    /// The insert and the counter update happen in one transaction. If the
    /// habit already has a completion for `day`, nothing is written.
    ///
    /// # Returns
    ///
    /// `true` if the completion was recorded, `false` if `day` was already taken.
    pub async fn record_completion(
        &self,
        completion: &CompletionEvent,
        day: NaiveDate,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO completions (id, habit_id, user_id, day, completed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(habit_id, day) DO NOTHING
            "#,
        )
        .bind(&completion.id)
        .bind(&completion.habit_id)
        .bind(&completion.user_id)
        .bind(day.to_string())
        .bind(completion.completed_at.timestamp())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !inserted {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE habits
            SET streak_count = streak_count + 1,
                last_completed = MAX(last_completed, ?)
            WHERE id = ?
            "#,
        )
        .bind(completion.completed_at.timestamp())
        .bind(&completion.habit_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    /// All completion events for a user across every habit.
    pub async fn list_completions(&self, user_id: &str) -> anyhow::Result<Vec<CompletionEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, habit_id, user_id, completed_at
            FROM completions
            WHERE user_id = ?
            ORDER BY completed_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(completion_from_row).collect()
    }

    /// Completion events for a user in the half-open range `[from, until)`.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owner of the completions
    /// * `from` - Inclusive lower bound (typically the start of a day)
    /// * `until` - Exclusive upper bound (typically the start of the next day)
    pub async fn list_completions_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Vec<CompletionEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, habit_id, user_id, completed_at
            FROM completions
            WHERE user_id = ? AND completed_at >= ? AND completed_at < ?
            ORDER BY completed_at ASC
            "#,
        )
        .bind(user_id)
        .bind(from.timestamp())
        .bind(until.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(completion_from_row).collect()
    }
}

fn timestamp_from_secs(ts: i64) -> anyhow::Result<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .with_context(|| format!("invalid stored timestamp {ts}"))
}

fn habit_from_row(row: &SqliteRow) -> anyhow::Result<Habit> {
    let frequency: String = row.try_get("frequency")?;
    let streak_count: i64 = row.try_get("streak_count")?;

    Ok(Habit {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        frequency: Frequency::parse(&frequency)
            .with_context(|| format!("unknown stored frequency '{frequency}'"))?,
        streak_count: u32::try_from(streak_count).context("stored streak_count out of range")?,
        last_completed: timestamp_from_secs(row.try_get("last_completed")?)?,
        created_at: timestamp_from_secs(row.try_get("created_at")?)?,
    })
}

fn completion_from_row(row: &SqliteRow) -> anyhow::Result<CompletionEvent> {
    Ok(CompletionEvent {
        id: row.try_get("id")?,
        habit_id: row.try_get("habit_id")?,
        user_id: row.try_get("user_id")?,
        completed_at: timestamp_from_secs(row.try_get("completed_at")?)?,
    })
}

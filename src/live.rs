//! A leaderboard that stays current as habits and completions change.
//!
//! [`LiveBoard`] runs one background task per user. The task listens on the
//! tracker's change feed and, for every relevant change, re-fetches the full
//! snapshot and re-ranks it. Results are published through a watch channel,
//! so readers always see the most recent ranking and a slow fetch can never
//! overwrite a newer one.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::RankedHabit;
use crate::realtime::{Collection, FeedMessage, Subscription};
use crate::tracker::HabitTracker;

/// Handle to a running live leaderboard.
pub struct LiveBoard {
    receiver: watch::Receiver<Vec<RankedHabit>>,
    task: JoinHandle<()>,
}

impl LiveBoard {
    /// Start tracking `user_id`'s leaderboard.
    ///
    /// Subscriptions are taken before the initial fetch, so no change made
    /// after this call returns can be missed.
    pub fn spawn(tracker: HabitTracker, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let habits = tracker.feed().subscribe(Collection::Habits);
        let completions = tracker.feed().subscribe(Collection::Completions);
        let (sender, receiver) = watch::channel(Vec::new());

        let task = tokio::spawn(run(tracker, user_id, habits, completions, sender));

        Self { receiver, task }
    }

    /// The latest published ranking.
    pub fn current(&self) -> Vec<RankedHabit> {
        self.receiver.borrow().clone()
    }

    /// Wait until a new ranking is published and return it.
    ///
    /// Returns `None` once the board has stopped.
    pub async fn changed(&mut self) -> Option<Vec<RankedHabit>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Stop the background task.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

async fn run(
    tracker: HabitTracker,
    user_id: String,
    mut habits: Subscription,
    mut completions: Subscription,
    sender: watch::Sender<Vec<RankedHabit>>,
) {
    refresh(&tracker, &user_id, &sender).await;

    loop {
        let message = tokio::select! {
            message = habits.recv() => message,
            message = completions.recv() => message,
            _ = sender.closed() => {
                debug!(user_id = %user_id, "Live board dropped by all readers");
                return;
            }
        };

        match message {
            Some(FeedMessage::Change(event)) if event.user_id == user_id => {
                debug!(
                    collection = ?event.collection,
                    kind = ?event.kind,
                    "Refreshing live board"
                );
                refresh(&tracker, &user_id, &sender).await;
            }
            Some(FeedMessage::Change(_)) => {}
            Some(FeedMessage::Lagged(missed)) => {
                warn!(user_id = %user_id, missed, "Live board lagged, resyncing");
                refresh(&tracker, &user_id, &sender).await;
            }
            None => {
                info!(user_id = %user_id, "Change feed closed, stopping live board");
                return;
            }
        }
    }
}

async fn refresh(
    tracker: &HabitTracker,
    user_id: &str,
    sender: &watch::Sender<Vec<RankedHabit>>,
) {
    match tracker.streak_board(user_id).await {
        Ok(board) => {
            sender.send_replace(board);
        }
        Err(e) => {
            // Keep showing the previous ranking.
            warn!(user_id = %user_id, error = %e, "Failed to refresh live board");
        }
    }
}

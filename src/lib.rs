//! Habit Streaks - habit tracking with consecutive-day streak rankings.
//!
//! # Overview
//!
//! Users create habits and mark them done once per day. From the history of
//! completions the service derives, per habit, the current streak, the best
//! streak and the number of distinct days completed, and ranks habits by their
//! best streak for a leaderboard.
//!
//! The streak computation in [`streak`] is pure and has no knowledge of the
//! store, the change feed or HTTP. Everything else exists to feed it snapshots.
//!
//! # Modules
//!
//! - [`model`]: Habits, completion events, and derived statistics
//! - [`streak`]: Streak computation and ranking
//! - [`storage`]: SQLite storage layer
//! - [`realtime`]: Change notifications for habit and completion documents
//! - [`tracker`]: The client object that writes documents and publishes changes
//! - [`live`]: A leaderboard that refreshes on every change
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod live;
pub mod model;
pub mod realtime;
pub mod storage;
pub mod streak;
pub mod tracker;

//! Habit Streaks - habit tracking with consecutive-day streak rankings.
//!
//! # API Endpoints
//!
//! - `POST /habits` - Create a habit
//! - `GET /habits` - List a user's habits
//! - `DELETE /habits/:id` - Delete a habit
//! - `POST /habits/:id/complete` - Mark a habit done for today
//! - `GET /habits/today` - Habits already completed today
//! - `GET /streaks` - Streak leaderboard
//! - `GET /health` - Health check

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use chrono::{FixedOffset, Local};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use habit_streaks::api::{AppState, router};
use habit_streaks::realtime::ChangeFeed;
use habit_streaks::storage::Storage;
use habit_streaks::tracker::HabitTracker;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:habits.db?mode=rwc";

/// Resolve the UTC offset that defines a calendar day.
///
/// `HABITS_UTC_OFFSET_MINUTES` wins; otherwise the host's current local offset is used.
fn day_offset() -> anyhow::Result<FixedOffset> {
    match env::var("HABITS_UTC_OFFSET_MINUTES") {
        Ok(raw) => {
            let minutes: i32 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid HABITS_UTC_OFFSET_MINUTES '{raw}'"))?;
            minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .with_context(|| format!("HABITS_UTC_OFFSET_MINUTES out of range: {minutes}"))
        }
        Err(_) => Ok(*Local::now().offset()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("habit_streaks=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("HABITS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url = env::var("HABITS_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let offset = day_offset()?;

    info!(port, db_url = %db_url, offset = %offset, "Starting Habit Streaks server");

    // Initialize storage
    let storage = Storage::new(&db_url).await?;
    info!("Database initialized");

    // The one client shared by every handler, torn down when the server exits
    let tracker = HabitTracker::new(storage, ChangeFeed::default(), offset);
    let state = AppState { tracker };

    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Habit Streaks is listening");

    axum::serve(listener, app).await?;

    Ok(())
}

//! HTTP API handlers.
//!
//! Handlers are thin: they translate requests into [`HabitTracker`] calls and
//! tracker errors into status codes. The acting user is identified by an
//! explicit `user_id`; authentication happens in front of this service.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::model::{
    CompleteHabitRequest, CompletionEvent, CreateHabitRequest, Habit, StreaksQuery,
    StreaksResponse, TodayResponse, UserQuery,
};
use crate::streak::leaderboard_top;
use crate::tracker::{HabitTracker, TrackerError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: HabitTracker,
}

/// Build the router with every endpoint mounted.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/habits", post(create_habit).get(list_habits))
        .route("/habits/today", get(get_today))
        .route("/habits/:id", delete(delete_habit))
        .route("/habits/:id/complete", post(complete_habit))
        .route("/streaks", get(get_streaks))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Map a tracker error to a response status, logging server-side failures.
fn error_status(error: &TrackerError) -> StatusCode {
    match error {
        TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
        TrackerError::HabitNotFound(_) => StatusCode::NOT_FOUND,
        TrackerError::AlreadyCompleted(_) => StatusCode::CONFLICT,
        TrackerError::Storage(e) => {
            warn!(error = %e, "Storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /habits - Create a habit.
///
/// # Request Body
///
/// ```json
/// {
///     "user_id": "user-1",
///     "title": "Read",
///     "description": "Ten pages before bed",
///     "frequency": "daily"
/// }
/// ```
///
/// Frequency is optional and defaults to "daily".
///
/// # Response
///
/// Returns `201 Created` with the stored habit.
#[instrument(skip(state, request), fields(user_id))]
pub async fn create_habit(
    State(state): State<AppState>,
    Json(request): Json<CreateHabitRequest>,
) -> Result<(StatusCode, Json<Habit>), StatusCode> {
    tracing::Span::current().record("user_id", &request.user_id);

    match state
        .tracker
        .create_habit(&request.user_id, request.habit, Utc::now())
        .await
    {
        Ok(habit) => Ok((StatusCode::CREATED, Json(habit))),
        Err(e) => {
            warn!(error = %e, "Failed to create habit");
            Err(error_status(&e))
        }
    }
}

/// GET /habits - List a user's habits.
///
/// # Query Parameters
///
/// - `user_id` (required): The owner of the habits
#[instrument(skip(state))]
pub async fn list_habits(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Habit>>, StatusCode> {
    state
        .tracker
        .list_habits(&query.user_id)
        .await
        .map(Json)
        .map_err(|e| error_status(&e))
}

/// DELETE /habits/:id - Delete a habit and its completions.
///
/// Returns `204 No Content`, or `404 Not Found` for an unknown id.
#[instrument(skip(state))]
pub async fn delete_habit(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.tracker.delete_habit(&id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            warn!(habit_id = %id, error = %e, "Failed to delete habit");
            error_status(&e)
        }
    }
}

/// POST /habits/:id/complete - Mark a habit done for today.
///
/// # Request Body
///
/// ```json
/// { "user_id": "user-1" }
/// ```
///
/// # Response
///
/// - `201 Created` with the recorded completion
/// - `404 Not Found` if the user has no such habit
/// - `409 Conflict` if the habit was already completed today
#[instrument(skip(state, request), fields(user_id))]
pub async fn complete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CompleteHabitRequest>,
) -> Result<(StatusCode, Json<CompletionEvent>), StatusCode> {
    tracing::Span::current().record("user_id", &request.user_id);

    match state
        .tracker
        .complete_habit(&request.user_id, &id, Utc::now())
        .await
    {
        Ok(completion) => Ok((StatusCode::CREATED, Json(completion))),
        Err(e) => {
            warn!(habit_id = %id, error = %e, "Failed to complete habit");
            Err(error_status(&e))
        }
    }
}

/// GET /habits/today - Habits already completed today.
///
/// # Response
///
/// ```json
/// { "habit_ids": ["7f0c..."] }
/// ```
#[instrument(skip(state))]
pub async fn get_today(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<TodayResponse>, StatusCode> {
    match state
        .tracker
        .completed_today(&query.user_id, Utc::now())
        .await
    {
        Ok(habit_ids) => Ok(Json(TodayResponse { habit_ids })),
        Err(e) => Err(error_status(&e)),
    }
}

/// GET /streaks - Streak statistics for every habit, ranked by best streak.
///
/// # Query Parameters
///
/// - `user_id` (required): The owner of the habits
/// - `top` (optional): Size of the podium (default: 3)
///
/// # Response
///
/// ```json
/// {
///     "top": [
///         {
///             "habit": { "id": "7f0c...", "title": "Read", ... },
///             "current_streak": 3,
///             "best_streak": 5,
///             "total_days": 12
///         }
///     ],
///     "habits": [ ... ]
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_streaks(
    State(state): State<AppState>,
    Query(query): Query<StreaksQuery>,
) -> Result<Json<StreaksResponse>, StatusCode> {
    match state.tracker.streak_board(&query.user_id).await {
        Ok(habits) => {
            info!(
                habit_count = habits.len(),
                leader_best = habits.first().map(|h| h.stats.best_streak),
                "Streaks queried"
            );
            Ok(Json(StreaksResponse {
                top: leaderboard_top(&habits, query.top),
                habits,
            }))
        }
        Err(e) => Err(error_status(&e)),
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

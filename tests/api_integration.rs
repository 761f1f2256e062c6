//! Integration tests for the Habit Streaks API endpoints.
//!
//! These tests verify the full request/response cycle through the HTTP API.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, FixedOffset, Utc};
use serde_json::{Value, json};

use habit_streaks::api::{AppState, router};
use habit_streaks::model::{CompletionEvent, Habit, NewHabit};
use habit_streaks::realtime::ChangeFeed;
use habit_streaks::storage::Storage;
use habit_streaks::tracker::HabitTracker;

async fn create_tracker() -> HabitTracker {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    HabitTracker::new(
        storage,
        ChangeFeed::default(),
        FixedOffset::east_opt(0).unwrap(),
    )
}

fn create_test_server(tracker: HabitTracker) -> TestServer {
    TestServer::new(router(AppState { tracker })).unwrap()
}

async fn post_habit(server: &TestServer, user_id: &str, title: &str) -> Habit {
    let response = server
        .post("/habits")
        .json(&json!({
            "user_id": user_id,
            "title": title,
            "description": format!("{title} every day")
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server(create_tracker().await);

    let response = server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_habit() {
    let server = create_test_server(create_tracker().await);

    let response = server
        .post("/habits")
        .json(&json!({
            "user_id": "user-1",
            "title": "Meditate",
            "description": "Ten minutes",
            "frequency": "weekly"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["title"], "Meditate");
    assert_eq!(body["frequency"], "weekly");
    assert_eq!(body["streak_count"], 0);
}

#[tokio::test]
async fn test_create_habit_requires_title() {
    let server = create_test_server(create_tracker().await);

    let response = server
        .post("/habits")
        .json(&json!({
            "user_id": "user-1",
            "title": "",
            "description": "Ten minutes"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_habits_scoped_to_user() {
    let server = create_test_server(create_tracker().await);

    post_habit(&server, "user-1", "Read").await;
    post_habit(&server, "user-2", "Run").await;

    let response = server.get("/habits?user_id=user-1").await;

    response.assert_status_ok();
    let habits: Vec<Habit> = response.json();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].title, "Read");
}

#[tokio::test]
async fn test_complete_habit_once_per_day() {
    let server = create_test_server(create_tracker().await);
    let habit = post_habit(&server, "user-1", "Read").await;

    let response = server
        .post(&format!("/habits/{}/complete", habit.id))
        .json(&json!({ "user_id": "user-1" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let completion: CompletionEvent = response.json();
    assert_eq!(completion.habit_id, habit.id);

    server
        .post(&format!("/habits/{}/complete", habit.id))
        .json(&json!({ "user_id": "user-1" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let response = server.get("/habits/today?user_id=user-1").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["habit_ids"], json!([habit.id]));

    let habits: Vec<Habit> = server.get("/habits?user_id=user-1").await.json();
    assert_eq!(habits[0].streak_count, 1);
}

#[tokio::test]
async fn test_complete_unknown_habit() {
    let server = create_test_server(create_tracker().await);
    let habit = post_habit(&server, "user-1", "Read").await;

    server
        .post("/habits/does-not-exist/complete")
        .json(&json!({ "user_id": "user-1" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Another user's habit is invisible
    server
        .post(&format!("/habits/{}/complete", habit.id))
        .json(&json!({ "user_id": "user-2" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_habit() {
    let server = create_test_server(create_tracker().await);
    let habit = post_habit(&server, "user-1", "Read").await;

    server
        .delete(&format!("/habits/{}", habit.id))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .delete(&format!("/habits/{}", habit.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let habits: Vec<Habit> = server.get("/habits?user_id=user-1").await.json();
    assert!(habits.is_empty());
}

#[tokio::test]
async fn test_streaks_empty() {
    let server = create_test_server(create_tracker().await);

    let response = server.get("/streaks?user_id=user-1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["top"].as_array().unwrap().is_empty());
    assert!(body["habits"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_streaks_ranked_by_best_streak() {
    let tracker = create_tracker().await;
    let server = create_test_server(tracker.clone());
    let now = Utc::now();

    // Seed history through the tracker so completions can span several days.
    let mut ids = Vec::new();
    for title in ["Floss", "Read", "Run", "Write"] {
        let habit = tracker
            .create_habit(
                "user-1",
                NewHabit {
                    title: title.to_string(),
                    description: "daily".to_string(),
                    frequency: Default::default(),
                },
                now - Duration::days(30),
            )
            .await
            .unwrap();
        ids.push(habit.id);
    }

    // Read: 3 consecutive days. Run: 5 consecutive days, a gap, then 2.
    for days_ago in [12, 11, 10] {
        tracker
            .complete_habit("user-1", &ids[1], now - Duration::days(days_ago))
            .await
            .unwrap();
    }
    for days_ago in [20, 19, 18, 17, 16, 5, 4] {
        tracker
            .complete_habit("user-1", &ids[2], now - Duration::days(days_ago))
            .await
            .unwrap();
    }
    // Write: one day
    tracker
        .complete_habit("user-1", &ids[3], now - Duration::days(1))
        .await
        .unwrap();

    let response = server.get("/streaks?user_id=user-1").await;
    response.assert_status_ok();
    let body: Value = response.json();

    let habits = body["habits"].as_array().unwrap();
    let titles: Vec<_> = habits
        .iter()
        .map(|h| h["habit"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Run", "Read", "Write", "Floss"]);

    assert_eq!(habits[0]["best_streak"], 5);
    assert_eq!(habits[0]["current_streak"], 2);
    assert_eq!(habits[0]["total_days"], 7);
    assert_eq!(habits[3]["best_streak"], 0);
    assert_eq!(habits[3]["total_days"], 0);

    let top = body["top"].as_array().unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0]["habit"]["title"], "Run");

    let response = server.get("/streaks?user_id=user-1&top=1").await;
    let body: Value = response.json();
    assert_eq!(body["top"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_workflow() {
    let server = create_test_server(create_tracker().await);

    // 1. Health check
    server.get("/health").await.assert_status_ok();

    // 2. Create habits and complete them
    let mut ids = Vec::new();
    for title in ["Read", "Run", "Stretch"] {
        ids.push(post_habit(&server, "user-1", title).await.id);
    }
    for id in &ids[..2] {
        server
            .post(&format!("/habits/{id}/complete"))
            .json(&json!({ "user_id": "user-1" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    // 3. Today's completions
    let body: Value = server.get("/habits/today?user_id=user-1").await.json();
    assert_eq!(body["habit_ids"].as_array().unwrap().len(), 2);

    // 4. Streaks: completed habits lead, ties keep creation order
    let body: Value = server.get("/streaks?user_id=user-1").await.json();
    let titles: Vec<_> = body["habits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["habit"]["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Read", "Run", "Stretch"]);
    assert_eq!(body["habits"][0]["current_streak"], 1);
    assert_eq!(body["habits"][2]["best_streak"], 0);
}

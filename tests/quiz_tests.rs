// tests/quiz_tests.rs

mod common;

use common::{create_course, spawn_app, token};
use serde_json::{Value, json};

/// Creates a four-question quiz whose correct indices are [0, 1, 2, 3].
/// Returns the quiz id and the question ids in order.
async fn create_quiz(app: &common::TestApp, instructor_id: i64, course_id: i64) -> (i64, Vec<i64>) {
    let response = app
        .client
        .post(app.url("/api/instructor/quizzes"))
        .bearer_auth(token(instructor_id, "instructor"))
        .json(&json!({
            "course_id": course_id,
            "title": "Ownership Basics",
            "questions": [
                { "text": "Q1", "options": ["a", "b", "c", "d"], "correct_answer": 0 },
                { "text": "Q2", "options": ["a", "b", "c", "d"], "correct_answer": 1 },
                { "text": "Q3", "options": ["a", "b", "c", "d"], "correct_answer": 2 },
                { "text": "Q4", "options": ["a", "b", "c", "d"], "correct_answer": 3 }
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    let ids = body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    (body["id"].as_i64().unwrap(), ids)
}

async fn submit(app: &common::TestApp, user_id: i64, quiz_id: i64, answers: Value) -> reqwest::Response {
    app.client
        .post(app.url("/api/quiz-attempts"))
        .bearer_auth(token(user_id, "student"))
        .json(&json!({ "quiz": quiz_id, "answers": answers }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_is_delivered_without_answer_keys() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, _) = create_quiz(&app, 1, course_id).await;

    let body: Value = app
        .client
        .get(app.url(&format!("/api/quizzes/{}", quiz_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 4);
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));
}

#[tokio::test]
async fn partial_submission_scores_fifty_percent() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, q) = create_quiz(&app, 1, course_id).await;

    // q1 right, q2 right, q3 wrong, q4 missing
    let answers = json!({
        q[0].to_string(): 0,
        q[1].to_string(): 1,
        q[2].to_string(): 9,
    });
    let response = submit(&app, 20, quiz_id, answers.clone()).await;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["score"], 50.0);
    assert_eq!(body["correct_count"], 2);
    assert_eq!(body["total_questions"], 4);
    assert_eq!(body["quiz_title"], "Ownership Basics");
    assert_eq!(body["answers"], answers);
}

#[tokio::test]
async fn full_and_empty_submissions() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, q) = create_quiz(&app, 1, course_id).await;

    let perfect = json!({
        q[0].to_string(): 0,
        q[1].to_string(): "1",
        q[2].to_string(): 2,
        q[3].to_string(): 3,
    });
    let body: Value = submit(&app, 20, quiz_id, perfect).await.json().await.unwrap();
    assert_eq!(body["score"], 100.0);

    let body: Value = submit(&app, 20, quiz_id, json!({})).await.json().await.unwrap();
    assert_eq!(body["score"], 0.0);
}

#[tokio::test]
async fn malformed_answers_grade_as_wrong_not_error() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, q) = create_quiz(&app, 1, course_id).await;

    let answers = json!({
        q[0].to_string(): "first",
        q[1].to_string(): null,
        q[2].to_string(): { "index": 2 },
        q[3].to_string(): 3,
    });
    let response = submit(&app, 20, quiz_id, answers).await;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["score"], 25.0);
}

#[tokio::test]
async fn malformed_answer_shape_grades_as_empty() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, _) = create_quiz(&app, 1, course_id).await;

    for answers in [Value::Null, json!([0, 1, 2, 3]), json!("x")] {
        let response = submit(&app, 20, quiz_id, answers).await;
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["score"], 0.0);
        assert_eq!(body["answers"], json!({}));
    }
    assert_eq!(app.store.all_attempts().await.len(), 3);
}

#[tokio::test]
async fn resubmitting_creates_a_second_attempt() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, q) = create_quiz(&app, 1, course_id).await;
    let answers = json!({ q[0].to_string(): 0 });

    let first: Value = submit(&app, 20, quiz_id, answers.clone()).await.json().await.unwrap();
    let second: Value = submit(&app, 20, quiz_id, answers).await.json().await.unwrap();
    assert_ne!(first["id"], second["id"]);

    let attempts: Vec<Value> = app
        .client
        .get(app.url("/api/quiz-attempts"))
        .bearer_auth(token(20, "student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a["score"] == 25.0));
}

#[tokio::test]
async fn learners_only_see_their_own_attempts() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, _) = create_quiz(&app, 1, course_id).await;

    submit(&app, 20, quiz_id, json!({})).await;
    submit(&app, 21, quiz_id, json!({})).await;

    let mine: Vec<Value> = app
        .client
        .get(app.url("/api/quiz-attempts"))
        .bearer_auth(token(20, "student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["user_id"], 20);

    let all: Vec<Value> = app
        .client
        .get(app.url("/api/quiz-attempts"))
        .bearer_auth(token(1, "instructor"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn unknown_quiz_is_404() {
    let app = spawn_app().await;
    let response = submit(&app, 20, 9999, json!({})).await;
    assert_eq!(response.status().as_u16(), 404);
    assert!(app.store.all_attempts().await.is_empty());
}

#[tokio::test]
async fn submitting_requires_a_token() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/api/quiz-attempts"))
        .json(&json!({ "quiz": 1, "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn students_cannot_author_quizzes() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;

    let response = app
        .client
        .post(app.url("/api/instructor/quizzes"))
        .bearer_auth(token(20, "student"))
        .json(&json!({
            "course_id": course_id,
            "title": "Sneaky",
            "questions": [{ "text": "?", "options": ["a", "b"], "correct_answer": 0 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn answer_key_out_of_range_is_rejected() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;

    let response = app
        .client
        .post(app.url("/api/instructor/quizzes"))
        .bearer_auth(token(1, "instructor"))
        .json(&json!({
            "course_id": course_id,
            "title": "Broken",
            "questions": [{ "text": "?", "options": ["a", "b"], "correct_answer": 5 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn attempt_is_recorded_as_analytics_event() {
    let app = spawn_app().await;
    let course_id = create_course(&app, 1, "0").await;
    let (quiz_id, _) = create_quiz(&app, 1, course_id).await;

    submit(&app, 20, quiz_id, json!({})).await;

    // The event is written in the background.
    let mut events = Vec::new();
    for _ in 0..50 {
        events = app.store.events().await;
        if !events.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "QUIZ_ATTEMPT");
    assert_eq!(events[0].user_id, 20);
}

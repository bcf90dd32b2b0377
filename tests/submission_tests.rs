// tests/submission_tests.rs

mod common;

use std::collections::HashMap;

use common::{TestApp, spawn_app};
use satprep::models::attempt::SubmissionResult;
use serde_json::{Value, json};

/// Exam with two 1-point questions whose answers are A and B.
async fn two_question_exam(app: &TestApp, passing_score: i64) -> (i64, i64, i64) {
    let exam_id = app.create_exam(passing_score).await;
    let q1 = app.add_question(exam_id, 0, None).await;
    let q2 = app.add_question(exam_id, 1, None).await;
    (exam_id, q1, q2)
}

#[tokio::test]
async fn half_correct_submission() {
    let app = spawn_app().await;
    let (exam_id, q1, q2) = two_question_exam(&app, 70).await;
    let (user_id, token) = app.register_user().await;

    let mut answers = HashMap::new();
    answers.insert(q1, "A");
    answers.insert(q2, "C");

    let response = app
        .submit(&token, exam_id, &json!({ "answers": answers, "time_spent": 120 }))
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let result: SubmissionResult = response.json().await.unwrap();
    assert_eq!(result.score, 50);
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.total_questions, 2);
    assert!(!result.passed);
    assert_eq!(result.time_spent, 120);

    let stored: (i64, i64, i64, bool, String) = sqlx::query_as(
        "SELECT user_id, score, correct_answers, passed, answers FROM user_exam_attempts WHERE id = $1",
    )
    .bind(result.attempt_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(stored.0, user_id);
    assert_eq!(stored.1, 50);
    assert_eq!(stored.2, 1);
    assert!(!stored.3);
    let raw: HashMap<String, String> = serde_json::from_str(&stored.4).unwrap();
    assert_eq!(raw.get(&q2.to_string()).map(String::as_str), Some("C"));

    let responses: Vec<(i64, Option<String>, bool)> = sqlx::query_as(
        "SELECT question_id, user_answer, is_correct FROM user_question_responses WHERE attempt_id = $1 ORDER BY question_id",
    )
    .bind(result.attempt_id)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(
        responses,
        vec![(q1, Some("A".to_string()), true), (q2, Some("C".to_string()), false)]
    );
}

#[tokio::test]
async fn perfect_submission_passes() {
    let app = spawn_app().await;
    let (exam_id, q1, q2) = two_question_exam(&app, 100).await;
    let (_, token) = app.register_user().await;

    let response = app
        .submit(
            &token,
            exam_id,
            &json!({ "answers": { q1.to_string(): "A", q2.to_string(): "B" }, "time_spent": 30 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let result: SubmissionResult = response.json().await.unwrap();
    assert_eq!(result.score, 100);
    assert!(result.passed);
}

#[tokio::test]
async fn empty_answers_score_zero_and_record_nulls() {
    let app = spawn_app().await;
    let (exam_id, _, _) = two_question_exam(&app, 50).await;
    let (_, token) = app.register_user().await;

    let response = app.submit(&token, exam_id, &json!({ "answers": {} })).await;
    assert_eq!(response.status().as_u16(), 201);

    let result: SubmissionResult = response.json().await.unwrap();
    assert_eq!(result.score, 0);
    assert_eq!(result.correct_answers, 0);
    assert_eq!(result.time_spent, 0);

    let null_answers: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_question_responses WHERE attempt_id = $1 AND user_answer IS NULL",
    )
    .bind(result.attempt_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(null_answers, 2);
}

#[tokio::test]
async fn weighted_points_drive_the_score() {
    let app = spawn_app().await;
    let exam_id = app.create_exam(70).await;
    let heavy = app.add_question(exam_id, 0, Some(3)).await;
    let light = app.add_question(exam_id, 0, Some(1)).await;
    let (_, token) = app.register_user().await;

    let result: SubmissionResult = app
        .submit(
            &token,
            exam_id,
            &json!({ "answers": { heavy.to_string(): "A", light.to_string(): "B" } }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(result.score, 75);
    assert_eq!(result.correct_answers, 1);
    assert!(result.passed);
}

#[tokio::test]
async fn unknown_exam_writes_nothing() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;

    let response = app
        .submit(&token, 987654, &json!({ "answers": { "1": "A" } }))
        .await;
    assert_eq!(response.status().as_u16(), 404);

    assert_eq!(app.count_rows("user_exam_attempts").await, 0);
    assert_eq!(app.count_rows("user_question_responses").await, 0);
}

#[tokio::test]
async fn exam_without_points_is_rejected_and_writes_nothing() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;

    let empty_exam = app.create_exam(50).await;
    let response = app.submit(&token, empty_exam, &json!({ "answers": {} })).await;
    assert_eq!(response.status().as_u16(), 400);

    let zero_exam = app.create_exam(50).await;
    let q = app.add_question(zero_exam, 0, Some(0)).await;
    let response = app
        .submit(&token, zero_exam, &json!({ "answers": { q.to_string(): "A" } }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(app.count_rows("user_exam_attempts").await, 0);
    assert_eq!(app.count_rows("user_question_responses").await, 0);
}

#[tokio::test]
async fn submission_requires_answers_and_token() {
    let app = spawn_app().await;
    let (exam_id, _, _) = two_question_exam(&app, 50).await;
    let (_, token) = app.register_user().await;

    let missing = app.submit(&token, exam_id, &json!({ "time_spent": 10 })).await;
    assert_eq!(missing.status().as_u16(), 400);

    let negative_time = app
        .submit(&token, exam_id, &json!({ "answers": {}, "time_spent": -5 }))
        .await;
    assert_eq!(negative_time.status().as_u16(), 400);

    let anonymous = app
        .client
        .post(app.url(&format!("/api/exams/{}/submit", exam_id)))
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    assert_eq!(app.count_rows("user_exam_attempts").await, 0);
}

#[tokio::test]
async fn cannot_submit_for_another_user() {
    let app = spawn_app().await;
    let (exam_id, _, _) = two_question_exam(&app, 50).await;
    let (victim_id, _) = app.register_user().await;
    let (self_id, token) = app.register_user().await;

    let forged = app
        .submit(&token, exam_id, &json!({ "user_id": victim_id, "answers": {} }))
        .await;
    assert_eq!(forged.status().as_u16(), 403);

    let honest = app
        .submit(&token, exam_id, &json!({ "user_id": self_id, "answers": {} }))
        .await;
    assert_eq!(honest.status().as_u16(), 201);
}

#[tokio::test]
async fn concurrent_retakes_produce_independent_attempts() {
    let app = spawn_app().await;
    let (exam_id, q1, q2) = two_question_exam(&app, 50).await;
    let (user_id, token) = app.register_user().await;

    let all_right = json!({ "answers": { q1.to_string(): "A", q2.to_string(): "B" } });
    let one_right = json!({ "answers": { q1.to_string(): "A", q2.to_string(): "D" } });

    let (a, b) = tokio::join!(
        app.submit(&token, exam_id, &all_right),
        app.submit(&token, exam_id, &one_right)
    );
    assert_eq!(a.status().as_u16(), 201);
    assert_eq!(b.status().as_u16(), 201);

    let a: SubmissionResult = a.json().await.unwrap();
    let b: SubmissionResult = b.json().await.unwrap();
    assert_ne!(a.attempt_id, b.attempt_id);
    assert_eq!(a.score, 100);
    assert_eq!(b.score, 50);

    let attempts: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT id, correct_answers FROM user_exam_attempts WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(attempts.len(), 2);

    for (attempt_id, correct_answers) in attempts {
        let (total, correct): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_correct), 0) FROM user_question_responses WHERE attempt_id = $1",
        )
        .bind(attempt_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
        assert_eq!(total, 2);
        assert_eq!(correct, correct_answers);
    }
}

#[tokio::test]
async fn results_round_trip_with_review() {
    let app = spawn_app().await;
    let (exam_id, q1, q2) = two_question_exam(&app, 70).await;
    let (_, token) = app.register_user().await;

    let submitted: SubmissionResult = app
        .submit(
            &token,
            exam_id,
            &json!({ "answers": { q1.to_string(): "A", q2.to_string(): "C" }, "time_spent": 95 }),
        )
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .get(app.url(&format!(
            "/api/exams/{}/results?attempt_id={}",
            exam_id, submitted.attempt_id
        )))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let results: Value = response.json().await.unwrap();
    assert_eq!(results["attempt_id"], submitted.attempt_id);
    assert_eq!(results["score"], 50);
    assert_eq!(results["correct_answers"], 1);
    assert_eq!(results["total_questions"], 2);
    assert_eq!(results["time_spent"], 95);
    assert_eq!(results["passed"], false);
    assert_eq!(results["passing_score"], 70);
    assert_eq!(results["exam_title"], "Digital SAT Practice Test");

    let review = results["responses"].as_array().unwrap();
    assert_eq!(review.len(), 2);
    assert_eq!(review[1]["user_answer"], "C");
    assert_eq!(review[1]["correct_answer"], "B");
    assert_eq!(review[1]["is_correct"], false);
}

#[tokio::test]
async fn results_access_rules() {
    let app = spawn_app().await;
    let (exam_id, q1, _) = two_question_exam(&app, 50).await;
    let (_, owner) = app.register_user().await;
    let (_, stranger) = app.register_user().await;

    let submitted: SubmissionResult = app
        .submit(&owner, exam_id, &json!({ "answers": { q1.to_string(): "A" } }))
        .await
        .json()
        .await
        .unwrap();

    let path = format!("/api/exams/{}/results?attempt_id={}", exam_id, submitted.attempt_id);

    let missing_param = app
        .client
        .get(app.url(&format!("/api/exams/{}/results", exam_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(missing_param.status().as_u16(), 400);

    let wrong_exam = app
        .client
        .get(app.url(&format!(
            "/api/exams/{}/results?attempt_id={}",
            exam_id + 1000,
            submitted.attempt_id
        )))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_exam.status().as_u16(), 404);

    let other_user = app.client.get(app.url(&path)).bearer_auth(&stranger).send().await.unwrap();
    assert_eq!(other_user.status().as_u16(), 403);

    let admin = app
        .client
        .get(app.url(&path))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status().as_u16(), 200);
}

#[tokio::test]
async fn deleting_a_question_keeps_attempt_history() {
    let app = spawn_app().await;
    let (exam_id, q1, q2) = two_question_exam(&app, 50).await;
    let (_, token) = app.register_user().await;

    let submitted: SubmissionResult = app
        .submit(
            &token,
            exam_id,
            &json!({ "answers": { q1.to_string(): "A", q2.to_string(): "B" } }),
        )
        .await
        .json()
        .await
        .unwrap();

    let delete = app
        .client
        .delete(app.url(&format!("/api/questions/{}", q1)))
        .bearer_auth(&app.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status().as_u16(), 204);

    let correct: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_question_responses WHERE attempt_id = $1 AND is_correct = 1",
    )
    .bind(submitted.attempt_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(correct, submitted.correct_answers);
}

#[tokio::test]
async fn mistyped_answers_are_a_json_400() {
    let app = spawn_app().await;
    let (exam_id, _, _) = two_question_exam(&app, 50).await;
    let (_, token) = app.register_user().await;

    let response = app.submit(&token, exam_id, &json!({ "answers": ["A"] })).await;
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("answers"));

    let response = app
        .submit(&token, exam_id, &json!({ "answers": { "q1": "A" } }))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    assert_eq!(app.count_rows("user_exam_attempts").await, 0);
}

#[tokio::test]
async fn storage_failure_mid_submission_rolls_back() {
    let app = spawn_app().await;
    let (exam_id, q1, q2) = two_question_exam(&app, 50).await;
    let (_, token) = app.register_user().await;

    sqlx::query(&format!(
        r#"
        CREATE TRIGGER reject_second_response
        BEFORE INSERT ON user_question_responses
        WHEN NEW.question_id = {}
        BEGIN
            SELECT RAISE(ABORT, 'response storage failed');
        END
        "#,
        q2
    ))
    .execute(&app.pool)
    .await
    .unwrap();

    let response = app
        .submit(
            &token,
            exam_id,
            &json!({ "answers": { q1.to_string(): "A", q2.to_string(): "B" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 500);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Internal Server Error" }));

    assert_eq!(app.count_rows("user_exam_attempts").await, 0);
    assert_eq!(app.count_rows("user_question_responses").await, 0);
}

// tests/result_api.rs
//
// Integration tests for submission grading, the result ledger, review
// reconstruction and teacher summaries.

use chrono::Utc;
use exam_api::{config::Config, routes, state::AppState, utils::jwt::sign_jwt};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    pool: SqlitePool,
}

/// Spawns the app on a random port over a fresh in-memory database.
async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

fn teacher_token(id: i64) -> String {
    sign_jwt(id, "teacher", JWT_SECRET, 600).unwrap()
}

fn student_token(id: i64) -> String {
    sign_jwt(id, "student", JWT_SECRET, 600).unwrap()
}

async fn seed_question(
    pool: &SqlitePool,
    teacher_id: i64,
    question_type: &str,
    correct_answer: Option<&str>,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO questions (teacher_id, content, type, options, correct_answer, created_at)
        VALUES (?1, 'Pick the right option', ?2, '["A","B","C"]', ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(teacher_id)
    .bind(question_type)
    .bind(correct_answer)
    .bind(Utc::now().to_rfc3339())
    .fetch_one(pool)
    .await
    .expect("Failed to seed question")
}

/// Creates a test owned by teacher 1 and returns its id.
async fn create_test(
    client: &reqwest::Client,
    address: &str,
    questions: serde_json::Value,
) -> i64 {
    let response = client
        .post(format!("{}/api/tests", address))
        .bearer_auth(teacher_token(1))
        .json(&serde_json::json!({
            "title": "Graded quiz",
            "durationMinutes": 30,
            "questions": questions
        }))
        .send()
        .await
        .expect("Failed to create test");
    assert_eq!(response.status().as_u16(), 201);
    response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn submission_is_graded_and_recorded() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let tf = seed_question(&app.pool, 1, "true_false", Some("true")).await;
    let essay = seed_question(&app.pool, 1, "essay", None).await;

    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([
            {"questionId": mcq, "points": 4},
            {"questionId": tf, "points": 3},
            {"questionId": essay, "points": 3}
        ]),
    )
    .await;

    let response = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": {
                (mcq.to_string()): "B",
                (tf.to_string()): "false",
                (essay.to_string()): "a long essay"
            }
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 4.0);
    assert_eq!(body["maxScore"], 6);
    assert!(body["id"].as_i64().is_some());
}

#[tokio::test]
async fn auto_grading_trims_whitespace_but_keeps_case() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let padded = seed_question(&app.pool, 1, "mcq", Some(" A ")).await;
    let cased = seed_question(&app.pool, 1, "mcq", Some("A")).await;

    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([
            {"questionId": padded, "points": 5},
            {"questionId": cased, "points": 5}
        ]),
    )
    .await;

    let body: serde_json::Value = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": {
                (padded.to_string()): "A",
                (cased.to_string()): "a"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // " A " vs "A" is correct after trimming; "a" vs "A" stays wrong.
    assert_eq!(body["score"], 5.0);
}

#[tokio::test]
async fn submitting_against_an_unknown_test_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({ "testId": 12345, "answers": {} }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn submitting_is_student_only() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(teacher_token(1))
        .json(&serde_json::json!({ "testId": 1, "answers": {} }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn every_submission_creates_a_new_ledger_entry() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 5}]),
    )
    .await;

    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/results/submit", app.address))
            .bearer_auth(student_token(9))
            .json(&serde_json::json!({
                "testId": test_id,
                "answers": { (mcq.to_string()): "B" }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let rows: Vec<serde_json::Value> = client
        .get(format!("{}/api/results/my", app.address))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["title"], "Graded quiz");
    assert_eq!(rows[0]["total_marks"], 5);
}

#[tokio::test]
async fn review_reconstructs_the_answer_sheet_and_is_idempotent() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let essay = seed_question(&app.pool, 1, "essay", None).await;

    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([
            {"questionId": mcq, "points": 4},
            {"questionId": essay, "points": 6}
        ]),
    )
    .await;

    let result_id = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": { (mcq.to_string()): "B" }
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let first: serde_json::Value = client
        .get(format!("{}/api/results/review/{}", app.address, result_id))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let questions = first["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["id"].as_i64().unwrap(), mcq);
    assert_eq!(questions[0]["studentAnswer"], "B");
    assert_eq!(questions[0]["correctAnswer"], "B");
    assert_eq!(questions[0]["isCorrect"], true);
    assert_eq!(questions[0]["gainedPoints"], 4);
    assert_eq!(questions[1]["studentAnswer"], serde_json::Value::Null);
    assert_eq!(questions[1]["isCorrect"], false);
    assert_eq!(questions[1]["gainedPoints"], 0);
    assert_eq!(first["result"]["maxScore"], 10);
    assert_eq!(first["result"]["score"], 4.0);

    // The snapshot is frozen: a second reconstruction is identical.
    let second: serde_json::Value = client
        .get(format!("{}/api/results/review/{}", app.address, result_id))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn review_is_scoped_to_the_submitting_student() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 5}]),
    )
    .await;

    let result_id = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": { (mcq.to_string()): "B" }
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = client
        .get(format!("{}/api/results/review/{}", app.address, result_id))
        .bearer_auth(student_token(10))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn review_snapshot_survives_a_later_test_edit() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 5}]),
    )
    .await;

    let result_id = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": { (mcq.to_string()): "B" }
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    // Re-weight the same question. The frozen points must not move.
    let response = client
        .put(format!("{}/api/tests/{}", app.address, test_id))
        .bearer_auth(teacher_token(1))
        .json(&serde_json::json!({
            "title": "Graded quiz",
            "durationMinutes": 30,
            "questions": [{"questionId": mcq, "points": 50}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let review: serde_json::Value = client
        .get(format!("{}/api/results/review/{}", app.address, result_id))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(review["questions"][0]["points"], 5);
    assert_eq!(review["questions"][0]["gainedPoints"], 5);
    assert_eq!(review["result"]["maxScore"], 5);
}

#[tokio::test]
async fn review_drops_questions_deleted_after_grading() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let kept = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let doomed = seed_question(&app.pool, 1, "mcq", Some("C")).await;

    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([
            {"questionId": kept, "points": 4},
            {"questionId": doomed, "points": 6}
        ]),
    )
    .await;

    let submit: serde_json::Value = client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": {
                (kept.to_string()): "B",
                (doomed.to_string()): "C"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let result_id = submit["id"].as_i64().unwrap();
    assert_eq!(submit["score"], 10.0);

    // The bank is maintained externally; a record can disappear after grading.
    sqlx::query("DELETE FROM questions WHERE id = ?1")
        .bind(doomed)
        .execute(&app.pool)
        .await
        .unwrap();

    let review: serde_json::Value = client
        .get(format!("{}/api/results/review/{}", app.address, result_id))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Only the surviving question renders; the recorded scores are untouched.
    let questions = review["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["id"].as_i64().unwrap(), kept);
    assert_eq!(questions[0]["gainedPoints"], 4);
    assert_eq!(review["result"]["score"], 10.0);
    assert_eq!(review["result"]["maxScore"], 10);
}

#[tokio::test]
async fn malformed_snapshot_fails_closed_to_an_empty_review() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 5}]),
    )
    .await;

    // A ledger row whose snapshot blob is garbage.
    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO results (test_id, student_id, score, submitted_at, details_json)
        VALUES (?1, 9, 0, ?2, 'not json at all')
        RETURNING id
        "#,
    )
    .bind(test_id)
    .bind(Utc::now().to_rfc3339())
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let response = client
        .get(format!("{}/api/results/review/{}", app.address, result_id))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let review: serde_json::Value = response.json().await.unwrap();
    // Questions come from the live test, with no frozen detail to show.
    assert_eq!(review["questions"][0]["studentAnswer"], serde_json::Value::Null);
    assert_eq!(review["questions"][0]["points"], 0);
    assert_eq!(review["result"]["maxScore"], serde_json::Value::Null);
}

#[tokio::test]
async fn summary_aggregates_scores_for_the_owner() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 10}]),
    )
    .await;

    for (student, answer) in [(9, "B"), (10, "C")] {
        client
            .post(format!("{}/api/results/submit", app.address))
            .bearer_auth(student_token(student))
            .json(&serde_json::json!({
                "testId": test_id,
                "answers": { (mcq.to_string()): answer }
            }))
            .send()
            .await
            .unwrap();
    }

    let body: serde_json::Value = client
        .get(format!("{}/api/results/summary/{}", app.address, test_id))
        .bearer_auth(teacher_token(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["stats"]["totalAttempts"], 2);
    assert_eq!(body["stats"]["avgScore"], 5.0);
    assert_eq!(body["stats"]["best"], 10.0);
    assert_eq!(body["stats"]["worst"], 0.0);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    // Another teacher cannot read it, and gets NotFound rather than Forbidden.
    let response = client
        .get(format!("{}/api/results/summary/{}", app.address, test_id))
        .bearer_auth(teacher_token(2))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn summary_over_zero_submissions_is_all_zeroes() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 10}]),
    )
    .await;

    let body: serde_json::Value = client
        .get(format!("{}/api/results/summary/{}", app.address, test_id))
        .bearer_auth(teacher_token(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["stats"]["totalAttempts"], 0);
    assert_eq!(body["stats"]["avgScore"], 0.0);
    assert_eq!(body["stats"]["best"], 0.0);
    assert_eq!(body["stats"]["worst"], 0.0);
}

#[tokio::test]
async fn deleting_a_test_cascades_to_its_ledger_entries() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let mcq = seed_question(&app.pool, 1, "mcq", Some("B")).await;
    let test_id = create_test(
        &client,
        &app.address,
        serde_json::json!([{"questionId": mcq, "points": 5}]),
    )
    .await;

    client
        .post(format!("{}/api/results/submit", app.address))
        .bearer_auth(student_token(9))
        .json(&serde_json::json!({
            "testId": test_id,
            "answers": { (mcq.to_string()): "B" }
        }))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(format!("{}/api/tests/{}", app.address, test_id))
        .bearer_auth(teacher_token(1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let rows: Vec<serde_json::Value> = client
        .get(format!("{}/api/results/my", app.address))
        .bearer_auth(student_token(9))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(rows.is_empty());
}

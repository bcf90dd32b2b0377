// tests/common/mod.rs
#![allow(dead_code)]

use satprep::{config::Config, db, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
    pub admin_token: String,
}

/// Spawns the app on a random port over a fresh SQLite file with a seeded admin.
pub async fn spawn_app() -> TestApp {
    let db_path = std::env::temp_dir().join(format!("satprep_test_{}.db", uuid::Uuid::new_v4()));

    let pool = db::connect(SqliteConnectOptions::new().filename(&db_path))
        .await
        .expect("Failed to open test database");

    db::migrate(&pool).await.expect("Failed to migrate database");

    let config = Config {
        database_url: format!("sqlite://{}", db_path.display()),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        admin_name: None,
    };

    db::seed_admin_user(&pool, &config)
        .await
        .expect("Failed to seed admin");

    let app = routes::create_router(AppState {
        pool: pool.clone(),
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut app = TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
        admin_token: String::new(),
    };
    app.admin_token = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    app
}

pub fn unique_email() -> String {
    format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        resp["token"].as_str().expect("Token not found").to_string()
    }

    /// Signs up a fresh student and returns (user id, token).
    pub async fn register_user(&self) -> (i64, String) {
        let email = unique_email();
        let resp = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({ "name": "Student", "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Signup failed");
        assert_eq!(resp.status().as_u16(), 201);

        let user: Value = resp.json().await.unwrap();
        let token = self.login(&email, PASSWORD).await;
        (user["id"].as_i64().unwrap(), token)
    }

    pub async fn create_exam(&self, passing_score: i64) -> i64 {
        let resp = self
            .client
            .post(self.url("/api/exams"))
            .bearer_auth(&self.admin_token)
            .json(&json!({
                "title": "Digital SAT Practice Test",
                "description": "Math and reading",
                "duration": 90,
                "total_questions": 10,
                "passing_score": passing_score,
                "subject": "SAT Prep"
            }))
            .send()
            .await
            .expect("Create exam failed");
        assert_eq!(resp.status().as_u16(), 201);

        let exam: Value = resp.json().await.unwrap();
        exam["id"].as_i64().unwrap()
    }

    /// Adds a four-option question to an exam. `correct` is a zero-based index.
    pub async fn add_question(&self, exam_id: i64, correct: i64, points: Option<i64>) -> i64 {
        let mut body = json!({
            "exam_id": exam_id,
            "type": "math",
            "topic": "Algebra",
            "difficulty": "easy",
            "question_text": "If 2x + 5 = 15, what is the value of x?",
            "choices": ["x = 3", "x = 5", "x = 7", "x = 10"],
            "correct_answer": correct,
            "explanation": "Subtract 5, then divide by 2."
        });
        if let Some(points) = points {
            body["points"] = json!(points);
        }

        let resp = self
            .client
            .post(self.url("/api/questions"))
            .bearer_auth(&self.admin_token)
            .json(&body)
            .send()
            .await
            .expect("Create question failed");
        assert_eq!(resp.status().as_u16(), 201);

        let question: Value = resp.json().await.unwrap();
        question["id"].as_i64().unwrap()
    }

    pub async fn submit(&self, token: &str, exam_id: i64, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/exams/{}/submit", exam_id)))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Submit failed")
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

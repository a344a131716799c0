#![allow(dead_code)]

use axum::body::Body;
use http_body_util::BodyExt;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use wayfarer::services::nearby::NearbyStrategy;
use wayfarer::AppState;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_strategy(NearbyStrategy::Query).await
    }

    pub async fn with_strategy(strategy: NearbyStrategy) -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(pool.clone(), strategy);
        let router = wayfarer::build_app(state, false)
            .await
            .expect("Failed to build app");

        Self { router, db: pool }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Create a user in the database and return (user_id, invite_code).
    pub async fn create_user(&self, name: &str) -> (String, String) {
        let id = uuid::Uuid::new_v4().to_string();
        let invite_code = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, name, invite_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(&invite_code)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test user");

        (id, invite_code)
    }

    /// Log in as the given user and return the session cookie string.
    pub async fn login(&self, invite_code: &str) -> String {
        let body = serde_json::json!({ "invite_code": invite_code }).to_string();
        let resp = self.send_json("POST", "/login", &body, None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        resp.headers()
            .get("set-cookie")
            .expect("Login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Create a user, log them in, and return (user_id, cookie).
    pub async fn signed_in(&self, name: &str) -> (String, String) {
        let (user_id, invite_code) = self.create_user(name).await;
        let cookie = self.login(&invite_code).await;
        (user_id, cookie)
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a JSON request with an optional session cookie.
    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: &str,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        self.send_json("POST", uri, &body.to_string(), cookie).await
    }

    pub async fn put_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        self.send_json("PUT", uri, &body.to_string(), cookie).await
    }

    /// Send a DELETE request with an optional session cookie.
    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method("DELETE");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Insert a location directly and return its id.
    pub async fn insert_location(&self, name: &str, latitude: f64, longitude: f64) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO locations (name, latitude, longitude, type, created_at, updated_at) VALUES (?, ?, ?, 'point_of_interest', ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.db)
        .await
        .expect("Failed to insert location");
        row.0
    }

    /// Insert a visit with an explicit timestamp.
    pub async fn insert_visit(&self, location_id: i64, visit_type: &str, created_at: &str) {
        sqlx::query(
            "INSERT INTO location_visits (location_id, type, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(location_id)
        .bind(visit_type)
        .bind(created_at)
        .bind(created_at)
        .execute(&self.db)
        .await
        .expect("Failed to insert visit");
    }

    /// Insert a rating with an explicit timestamp.
    pub async fn insert_rating(
        &self,
        location_id: i64,
        user_id: &str,
        rating: i64,
        comment: Option<&str>,
        created_at: &str,
    ) {
        sqlx::query(
            "INSERT INTO location_ratings (location_id, user_id, rating, comment, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(location_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .bind(created_at)
        .bind(created_at)
        .execute(&self.db)
        .await
        .expect("Failed to insert rating");
    }

    pub async fn count(&self, sql: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(sql)
            .fetch_one(&self.db)
            .await
            .expect("Failed to count rows");
        row.0
    }
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read the full response body as JSON.
pub async fn body_json(resp: Response) -> Value {
    let body = body_string(resp).await;
    serde_json::from_str(&body).unwrap_or_else(|e| panic!("invalid JSON body {body:?}: {e}"))
}

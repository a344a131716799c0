mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn rating_requires_sign_in() {
    let app = TestApp::new().await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    let resp = app
        .post_json("/api/locations/rate", json!({ "location_id": id, "rating": 4 }), None)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.count("SELECT COUNT(*) FROM location_ratings").await, 0);
}

#[tokio::test]
async fn first_rating_is_created() {
    let app = TestApp::new().await;
    let (user_id, cookie) = app.signed_in("Critic").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    let resp = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": 4, "comment": "Nice" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = body_json(resp).await;
    assert_eq!(body["location_id"], id);
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["rating"], 4);
    assert_eq!(body["comment"], "Nice");
}

#[tokio::test]
async fn resubmission_updates_in_place_and_keeps_comment() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("Critic").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    let first = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": 4, "comment": "Nice" }),
            Some(&cookie),
        )
        .await;
    let first = body_json(first).await;

    let second = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": 2, "comment": null }),
            Some(&cookie),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CREATED);
    let second = body_json(second).await;

    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["rating"], 2);
    assert_eq!(second["comment"], "Nice");
    assert_eq!(second["created_at"], first["created_at"]);
    assert_eq!(app.count("SELECT COUNT(*) FROM location_ratings").await, 1);
}

#[tokio::test]
async fn resubmission_with_comment_replaces_it() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("Critic").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    app.post_json(
        "/api/locations/rate",
        json!({ "location_id": id, "rating": 4, "comment": "Nice" }),
        Some(&cookie),
    )
    .await;
    let resp = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": 5, "comment": "Even better at night" }),
            Some(&cookie),
        )
        .await;
    let body = body_json(resp).await;
    assert_eq!(body["rating"], 5);
    assert_eq!(body["comment"], "Even better at night");
}

#[tokio::test]
async fn different_users_get_separate_rows() {
    let app = TestApp::new().await;
    let (_a, cookie_a) = app.signed_in("A").await;
    let (_b, cookie_b) = app.signed_in("B").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    for cookie in [&cookie_a, &cookie_b] {
        app.post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": 3 }),
            Some(cookie),
        )
        .await;
    }

    assert_eq!(app.count("SELECT COUNT(*) FROM location_ratings").await, 2);
}

#[tokio::test]
async fn rejects_out_of_range_rating_and_unknown_location() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("Critic").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    for rating in [0, 6] {
        let resp = app
            .post_json(
                "/api/locations/rate",
                json!({ "location_id": id, "rating": rating }),
                Some(&cookie),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert!(body["errors"]["rating"].is_string());
    }

    let resp = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id + 100, "rating": 3 }),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errors"]["location_id"], "The selected location is invalid");

    assert_eq!(app.count("SELECT COUNT(*) FROM location_ratings").await, 0);
}

#[tokio::test]
async fn rating_a_deleted_location_is_a_location_error() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("Critic").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    let resp = app.delete(&format!("/api/locations/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": 5, "comment": "Gone?" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errors"]["location_id"], "The selected location is invalid");
    assert_eq!(app.count("SELECT COUNT(*) FROM location_ratings").await, 0);
}

#[tokio::test]
async fn mistyped_rating_fields_are_field_errors() {
    let app = TestApp::new().await;
    let (_user_id, cookie) = app.signed_in("Critic").await;
    let id = app.insert_location("Plaza", 1.0, 1.0).await;

    let resp = app
        .post_json(
            "/api/locations/rate",
            json!({ "location_id": id, "rating": "x" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert!(body["errors"]["rating"].is_string());

    let resp = app
        .post_json("/api/locations/rate", json!({ "rating": 3 }), Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errors"]["location_id"], "The location_id field is required");
}

use super::*;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use serde::de::DeserializeOwned;
use shared::{domain::Tutorial, error::MessageResponse};
use tower::ServiceExt;

async fn test_app() -> Router {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let state = AppState {
        api: ApiContext::new(storage),
    };
    build_router(Arc::new(state))
}

fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json")
}

async fn create(app: &Router, body: serde_json::Value) -> Tutorial {
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/tutorials", body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let app = test_app().await;
    let response = app
        .oneshot(empty_request(Method::GET, "/healthz"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn create_route_returns_record_with_defaults() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/tutorials",
            serde_json::json!({ "title": "Learn Go" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let value: serde_json::Value = read_json(response).await;
    assert_eq!(value["id"], 1);
    assert_eq!(value["title"], "Learn Go");
    assert!(value["description"].is_null());
    assert_eq!(value["published"], false);
}

#[tokio::test]
async fn create_route_rejects_missing_title_with_message_body() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/tutorials",
            serde_json::json!({ "description": "no title" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(response).await;
    assert_eq!(body.message, "title can not be empty!");

    let listed: Vec<Tutorial> = read_json(
        app.oneshot(empty_request(Method::GET, "/tutorials"))
            .await
            .expect("response"),
    )
    .await;
    assert!(listed.is_empty());
}

#[tokio::test]
async fn malformed_json_keeps_message_shape() {
    let app = test_app().await;
    let request = Request::post("/tutorials")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert!(response.status().is_client_error());
    let body: MessageResponse = read_json(response).await;
    assert!(!body.message.is_empty());
}

#[tokio::test]
async fn list_route_applies_title_query() {
    let app = test_app().await;
    for title in ["rust basics", "advanced rust", "Go"] {
        create(&app, serde_json::json!({ "title": title })).await;
    }

    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, "/tutorials?title=rust"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let matched: Vec<Tutorial> = read_json(response).await;
    assert_eq!(matched.len(), 2);

    let all: Vec<Tutorial> = read_json(
        app.oneshot(empty_request(Method::GET, "/tutorials"))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn get_route_maps_missing_and_malformed_ids() {
    let app = test_app().await;
    let created = create(&app, serde_json::json!({ "title": "present" })).await;

    let found: Tutorial = read_json(
        app.clone()
            .oneshot(empty_request(
                Method::GET,
                &format!("/tutorials/{}", created.id.0),
            ))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(found, created);

    let missing = app
        .clone()
        .oneshot(empty_request(Method::GET, "/tutorials/999"))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: MessageResponse = read_json(missing).await;
    assert_eq!(body.message, "Cannot find Tutorial with id=999.");

    let malformed = app
        .oneshot(empty_request(Method::GET, "/tutorials/not-a-number"))
        .await
        .expect("response");
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(malformed).await;
    assert!(!body.message.is_empty());
}

#[tokio::test]
async fn malformed_ids_keep_message_shape_on_update_and_delete() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, "/tutorials/abc"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(response).await;
    assert!(body.message.contains("abc"));

    let response = app
        .oneshot(json_request(
            Method::PUT,
            "/tutorials/abc",
            serde_json::json!({ "published": true }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(response).await;
    assert!(body.message.contains("abc"));
}

#[tokio::test]
async fn update_route_clears_description_on_explicit_null() {
    let app = test_app().await;
    let created = create(
        &app,
        serde_json::json!({ "title": "described", "description": "to be cleared" }),
    )
    .await;
    let uri = format!("/tutorials/{}", created.id.0);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &uri,
            serde_json::json!({ "published": true }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let kept: Tutorial = read_json(
        app.clone()
            .oneshot(empty_request(Method::GET, &uri))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(kept.description.as_deref(), Some("to be cleared"));

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &uri,
            serde_json::json!({ "description": null }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let cleared: Tutorial = read_json(
        app.oneshot(empty_request(Method::GET, &uri))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(cleared.description, None);
}

#[tokio::test]
async fn update_route_reports_success_and_missing_rows() {
    let app = test_app().await;
    let created = create(&app, serde_json::json!({ "title": "draft" })).await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/tutorials/{}", created.id.0),
            serde_json::json!({ "title": "final", "published": true }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = read_json(response).await;
    assert_eq!(body.message, "Tutorial was updated successfully.");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/tutorials/999",
            serde_json::json!({ "published": true }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/tutorials/{}", created.id.0),
            serde_json::json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_routes_remove_single_and_all_records() {
    let app = test_app().await;
    let first = create(&app, serde_json::json!({ "title": "one" })).await;
    create(&app, serde_json::json!({ "title": "two" })).await;
    create(&app, serde_json::json!({ "title": "three" })).await;

    let uri = format!("/tutorials/{}", first.id.0);
    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, &uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, "/tutorials"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = read_json(response).await;
    assert_eq!(body.message, "2 Tutorials were deleted successfully!");

    let remaining: Vec<Tutorial> = read_json(
        app.oneshot(empty_request(Method::GET, "/tutorials"))
            .await
            .expect("response"),
    )
    .await;
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn published_route_tracks_publish_updates() {
    let app = test_app().await;
    let created = create(&app, serde_json::json!({ "title": "Learn Go" })).await;

    let published: Vec<Tutorial> = read_json(
        app.clone()
            .oneshot(empty_request(Method::GET, "/tutorials/published"))
            .await
            .expect("response"),
    )
    .await;
    assert!(published.is_empty());

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/tutorials/{}", created.id.0),
            serde_json::json!({ "published": true }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let published: Vec<Tutorial> = read_json(
        app.oneshot(empty_request(Method::GET, "/tutorials/published"))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, created.id);
}

#[tokio::test]
async fn body_limit_rejects_oversized_payloads() {
    let settings = Settings {
        max_body_bytes: 32,
        ..Settings::default()
    };
    let app = with_middleware(test_app().await, &settings).expect("middleware");
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/tutorials",
            serde_json::json!({ "title": "x".repeat(256) }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_echoes_configured_origin() {
    let settings = Settings {
        cors_allowed_origin: Some("http://localhost:8081".into()),
        ..Settings::default()
    };
    let app = with_middleware(test_app().await, &settings).expect("middleware");
    let request = Request::get("/tutorials")
        .header(header::ORIGIN, "http://localhost:8081")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:8081")
    );
}

#[test]
fn invalid_cors_origin_is_a_config_error() {
    assert!(cors_layer(Some("bad\norigin")).is_err());
}

mod harness;

use axum::Router;
use axum::routing::{get, post};
use bulwark_config::Environment;
use bulwark_core::{AppError, CastFailure, DuplicateKeyFailure, Failure, FailureRecord, ValidationFailure};
use bulwark_server::{ApiError, Json};
use harness::config::ConfigBuilder;
use harness::server::TestServer;
use indexmap::IndexMap;
use serde_json::{Value, json};

fn routes() -> Router {
    Router::new()
        .route(
            "/api/users/{id}",
            get(|axum::extract::Path(id): axum::extract::Path<String>| async move {
                Err::<(), _>(ApiError::from(Failure::from(CastFailure::new("_id", id))))
            }),
        )
        .route(
            "/api/signup",
            post(|| async {
                let key_value = IndexMap::from([("email".to_owned(), json!("a@b.com"))]);
                Err::<(), _>(ApiError::from(Failure::from(DuplicateKeyFailure::new(key_value))))
            }),
        )
        .route(
            "/api/profile",
            post(|| async {
                let errors = IndexMap::from([
                    ("name".to_owned(), "Name required".to_owned()),
                    ("age".to_owned(), "Age must be positive".to_owned()),
                ]);
                Err::<(), _>(ApiError::from(Failure::from(ValidationFailure::new(errors))))
            }),
        )
        .route(
            "/api/forbidden",
            get(|| async { Err::<(), _>(ApiError::from(AppError::new("You may not pass", 403))) }),
        )
        .route(
            "/api/timeout",
            get(|| async { Err::<(), _>(ApiError::from(Failure::unknown("db timeout"))) }),
        )
        .route(
            "/api/records",
            post(|Json(record): Json<FailureRecord>| async move { Err::<(), _>(ApiError::from(record)) }),
        )
}

async fn start(environment: Environment) -> TestServer {
    let config = ConfigBuilder::new().with_environment(environment).build();
    TestServer::start_with_routes(config, routes()).await.unwrap()
}

async fn get_json(server: &TestServer, path: &str) -> (u16, Value) {
    let resp = server.client().get(server.url(path)).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post_json(server: &TestServer, path: &str, body: &Value) -> (u16, Value) {
    let resp = server.client().post(server.url(path)).json(body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// -- Production --

#[tokio::test]
async fn cast_failure_becomes_400() {
    let server = start(Environment::Production).await;

    let (status, body) = get_json(&server, "/api/users/abc").await;

    assert_eq!(status, 400);
    assert_eq!(body, json!({"status": "FAIL", "message": "Invalid _id: abc!"}));
}

#[tokio::test]
async fn duplicate_key_becomes_400() {
    let server = start(Environment::Production).await;

    let (status, body) = post_json(&server, "/api/signup", &json!({})).await;

    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({"status": "FAIL", "message": "a@b.com already in use. Please use another email!"})
    );
}

#[tokio::test]
async fn validation_messages_are_joined() {
    let server = start(Environment::Production).await;

    let (status, body) = post_json(&server, "/api/profile", &json!({})).await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Name required. Age must be positive");
}

#[tokio::test]
async fn operational_errors_keep_status_and_message() {
    let server = start(Environment::Production).await;

    let (status, body) = get_json(&server, "/api/forbidden").await;

    assert_eq!(status, 403);
    assert_eq!(body, json!({"status": "FAIL", "message": "You may not pass"}));
}

#[tokio::test]
async fn unknown_failures_are_generic() {
    let server = start(Environment::Production).await;

    let (status, body) = get_json(&server, "/api/timeout").await;

    assert_eq!(status, 500);
    assert_eq!(body, json!({"status": "ERROR", "message": "Something went very wrong!"}));
}

#[tokio::test]
async fn raw_driver_records_are_classified() {
    let server = start(Environment::Production).await;

    let cast = json!({"name": "CastError", "path": "id", "value": "abc", "message": "Cast to ObjectId failed"});
    let (status, body) = post_json(&server, "/api/records", &cast).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid id: abc!");

    let duplicate = json!({"code": 11000, "keyValue": {"username": "alice"}});
    let (status, body) = post_json(&server, "/api/records", &duplicate).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "alice already in use. Please use another username!");

    let float_code = json!({"code": 11000.0, "keyValue": {"email": "a@b.com"}});
    let (status, body) = post_json(&server, "/api/records", &float_code).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "a@b.com already in use. Please use another email!");

    let validation = json!({
        "name": "ValidationError",
        "errors": {"name": {"message": "Name required"}, "age": "Age must be positive"}
    });
    let (status, body) = post_json(&server, "/api/records", &validation).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Name required. Age must be positive");

    let operational = json!({"message": "Too late", "statusCode": 410, "isOperational": true});
    let (status, body) = post_json(&server, "/api/records", &operational).await;
    assert_eq!(status, 410);
    assert_eq!(body, json!({"status": "FAIL", "message": "Too late"}));

    let unknown = json!({"message": "db timeout"});
    let (status, body) = post_json(&server, "/api/records", &unknown).await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Something went very wrong!");
}

#[tokio::test]
async fn unrecognized_environment_filters() {
    let server = start(Environment::Unrecognized).await;

    let (status, body) = get_json(&server, "/api/timeout").await;

    assert_eq!(status, 500);
    assert_eq!(body["message"], "Something went very wrong!");
    assert!(body.get("stack").is_none());
}

// -- Development --

#[tokio::test]
async fn development_discloses_everything() {
    let server = start(Environment::Development).await;

    let (status, body) = get_json(&server, "/api/timeout").await;

    assert_eq!(status, 500);
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["message"], "db timeout");
    assert_eq!(body["error"]["message"], "db timeout");
    assert_eq!(body["error"]["isOperational"], false);
    assert!(!body["stack"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn development_does_not_classify() {
    let server = start(Environment::Development).await;

    let (status, body) = get_json(&server, "/api/users/abc").await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["name"], "CastError");
    assert_eq!(body["error"]["path"], "_id");
    assert_eq!(body["error"]["value"], "abc");
}

#[tokio::test]
async fn development_keeps_operational_status() {
    let server = start(Environment::Development).await;

    let (status, body) = get_json(&server, "/api/forbidden").await;

    assert_eq!(status, 403);
    assert_eq!(body["status"], "FAIL");
    assert_eq!(body["message"], "You may not pass");
    assert!(body["stack"].is_string());
}

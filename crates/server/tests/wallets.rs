use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    server::app(db)
}

fn request(method: &str, uri: &str, password: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(password) = password {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {password}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn snapshot() -> Value {
    json!({
        "accounts": [{"id": "acc-1", "name": "Cash"}],
        "transactions": [],
        "recurring": [],
        "creditCards": [],
        "ccTransactions": []
    })
}

#[tokio::test]
async fn create_then_fetch_returns_the_stamped_document() {
    let app = app().await;

    let (status, created) = send(
        &app,
        request("POST", "/api/wallet/wallet_abc", Some("secret"), Some(snapshot())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["walletId"], "wallet_abc");
    assert!(created["createdAt"].is_string());

    let (status, doc) = send(&app, request("GET", "/api/wallet/wallet_abc", Some("secret"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["accounts"][0]["id"], "acc-1");
    assert!(doc["createdAt"].is_string());
    assert!(doc["updatedAt"].is_string());
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let app = app().await;
    let uri = "/api/wallet/wallet_dup";
    send(&app, request("POST", uri, Some("secret"), Some(snapshot()))).await;

    let (status, body) = send(&app, request("POST", uri, Some("other"), Some(snapshot()))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Wallet already exists");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_creates_of_one_id_conflict() {
    let app = app().await;
    let uri = "/api/wallet/wallet_race";

    let ((first, _), (second, body)) = tokio::join!(
        send(&app, request("POST", uri, Some("secret"), Some(snapshot()))),
        send(&app, request("POST", uri, Some("other"), Some(snapshot()))),
    );
    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
    if second == StatusCode::CONFLICT {
        assert_eq!(body["error"], "Wallet already exists");
    }
}

#[tokio::test]
async fn unknown_wallet_and_wrong_password_are_distinct() {
    let app = app().await;
    send(
        &app,
        request("POST", "/api/wallet/wallet_x", Some("secret"), Some(snapshot())),
    )
    .await;

    let (status, _) = send(&app, request("GET", "/api/wallet/nope", Some("secret"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("GET", "/api/wallet/wallet_x", Some("wrong"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/api/wallet/wallet_x", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn replace_is_a_full_document_swap_keeping_created_at() {
    let app = app().await;
    let uri = "/api/wallet/wallet_r";
    send(&app, request("POST", uri, Some("secret"), Some(snapshot()))).await;
    let (_, before) = send(&app, request("GET", uri, Some("secret"), None)).await;

    let (status, replaced) = send(
        &app,
        request("PUT", uri, Some("secret"), Some(json!({"transactions": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(replaced["updatedAt"].is_string());

    let (_, after) = send(&app, request("GET", uri, Some("secret"), None)).await;
    assert!(after.get("accounts").is_none());
    assert_eq!(after["createdAt"], before["createdAt"]);
}

#[tokio::test]
async fn non_object_body_is_rejected() {
    let app = app().await;
    let (status, _) = send(
        &app,
        request("POST", "/api/wallet/wallet_a", Some("secret"), Some(json!([1, 2]))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_requires_the_password() {
    let app = app().await;
    let uri = "/api/wallet/wallet_d";
    send(&app, request("POST", uri, Some("secret"), Some(snapshot()))).await;

    let (status, _) = send(&app, request("DELETE", uri, Some("wrong"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, request("DELETE", uri, Some("secret"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["walletId"], "wallet_d");

    let (status, _) = send(&app, request("GET", uri, Some("secret"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_needs_no_credential() {
    let app = app().await;
    let (status, body) = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

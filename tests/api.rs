use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use microblog::auth::BcryptHasher;
use microblog::db::{InMemoryStore, JsonFileStore, SqliteStore, Store};
use microblog::AppState;

const USER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const TWEET_ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

fn state(store: Arc<dyn Store>) -> AppState {
    AppState::new(store, Arc::new(BcryptHasher::new(4)))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(microblog::configure),
        )
        .await
    };
}

fn ana() -> Value {
    json!({
        "id": USER_ID,
        "email": "a@b.com",
        "first_name": "Ana",
        "last_name": "Li",
        "password": "password1",
    })
}

#[actix_web::test]
async fn signup_get_delete_roundtrip() {
    let app = app!(state(Arc::new(InMemoryStore::new())));

    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["first_name"], "Ana");
    assert!(body.get("password").is_none());
    assert!(body.get("hashed_password").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", USER_ID))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], USER_ID);
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["last_name"], "Li");
    assert_eq!(body["birth_date"], Value::Null);

    let req = test::TestRequest::delete()
        .uri(&format!("/users/{}/delete", USER_ID))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"user id deleted": USER_ID}));

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", USER_ID))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], format!("user {} not found", USER_ID));
}

#[actix_web::test]
async fn signup_rejects_invalid_payloads() {
    let app = app!(state(Arc::new(InMemoryStore::new())));

    let mut short_password = ana();
    short_password["password"] = json!("short");
    let mut bad_email = ana();
    bad_email["email"] = json!("not-an-email");
    let mut missing_name = ana();
    missing_name.as_object_mut().unwrap().remove("first_name");

    for body in [short_password, bad_email, missing_name] {
        let req = test::TestRequest::post().uri("/signup").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let req = test::TestRequest::get().uri("/users").to_request();
    let users: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users, json!([]));
}

#[actix_web::test]
async fn duplicate_email_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("api.db"), 2).unwrap();
    let app = app!(state(Arc::new(store)));

    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let mut twin = ana();
    twin["id"] = json!("9b2d1c44-0a4e-4a55-9d6f-3f1e2a7b8c90");
    twin["email"] = json!("A@B.com");
    let req = test::TestRequest::post().uri("/signup").set_json(twin).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn path_ids_must_be_36_characters() {
    let app = app!(state(Arc::new(InMemoryStore::new())));

    for uri in [
        "/users/abc",
        "/users/3fa85f6457174562b3fc2c963f66afa6",
        "/tweets/3fa85f64-5717-4562-b3fc-2c963f66afa",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
    }
}

#[actix_web::test]
async fn login_checks_credentials() {
    let app = app!(state(Arc::new(InMemoryStore::new())));
    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "a@b.com", "password": "password1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], USER_ID);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "a@b.com"), ("password", "password1")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "a@b.com", "password": "password2"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "nobody@b.com"), ("password", "password1")])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn update_user_changes_password_and_birth_date() {
    let app = app!(state(Arc::new(InMemoryStore::new())));
    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri(&format!("/users/{}/update", USER_ID))
        .set_json(json!({"password": "new-password", "birth_date": "1994-07-12"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["birth_date"], "1994-07-12");
    assert_eq!(body["first_name"], "Ana");
    assert_eq!(body["email"], "a@b.com");

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "a@b.com", "password": "new-password"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri("/users/7c9e6679-7425-40de-944b-e07fc1f90ae7/update")
        .set_json(json!({"birth_date": "1994-07-12"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn tweet_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let app = app!(state(Arc::new(store)));

    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/post")
        .set_json(json!({"id": TWEET_ID, "content": "hello world", "user_id": USER_ID}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["content"], "hello world");
    assert_eq!(body["updated_at"], Value::Null);

    let req = test::TestRequest::get().uri("/").to_request();
    let tweets: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tweets.as_array().unwrap().len(), 1);
    assert_eq!(tweets[0]["user_id"], USER_ID);

    let req = test::TestRequest::put()
        .uri(&format!("/tweets/{}/update", TWEET_ID))
        .set_json(json!({"content": "edited"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/tweets/{}", TWEET_ID))
        .to_request();
    let tweet: microblog::models::Tweet = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tweet.content, "edited");
    assert!(tweet.updated_at.unwrap() >= tweet.created_at);

    let req = test::TestRequest::delete()
        .uri(&format!("/tweets/{}/delete", TWEET_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"tweet id deleted": TWEET_ID}));

    let req = test::TestRequest::get()
        .uri(&format!("/tweets/{}", TWEET_ID))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn tweet_for_unknown_user_is_rejected() {
    let app = app!(state(Arc::new(InMemoryStore::new())));

    let req = test::TestRequest::post()
        .uri("/post")
        .set_json(json!({"content": "nobody home", "user_id": USER_ID}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], format!("user {} does not exist", USER_ID));
}

#[actix_web::test]
async fn tweet_update_time_is_checked_against_default_creation_time() {
    let app = app!(state(Arc::new(InMemoryStore::new())));
    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/post")
        .set_json(json!({
            "content": "x",
            "user_id": USER_ID,
            "updated_at": "2000-01-01T00:00:00Z",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get().uri("/").to_request();
    let tweets: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tweets, json!([]));

    let req = test::TestRequest::post()
        .uri("/post")
        .set_json(json!({
            "content": "backdated",
            "user_id": USER_ID,
            "created_at": "2000-01-01T00:00:00Z",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let tweet: microblog::models::Tweet = test::read_body_json(resp).await;
    assert_eq!(tweet.created_at.to_rfc3339(), "2000-01-01T00:00:00+00:00");
    assert_eq!(tweet.updated_at, None);
}

#[actix_web::test]
async fn tweet_content_is_validated() {
    let app = app!(state(Arc::new(InMemoryStore::new())));
    let req = test::TestRequest::post().uri("/signup").set_json(ana()).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/post")
        .set_json(json!({"content": "x".repeat(257), "user_id": USER_ID}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

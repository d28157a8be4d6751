//! Integration tests: build the router over the in-memory store and drive it with `oneshot`.

use std::sync::Arc;

use accord_api::{AppState, config::ApiConfig};
use accord_core::oauth::ProviderRegistration;
use accord_core::store::MemoryAccountStore;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> ApiConfig {
    ApiConfig::from_lookup(|key| match key {
        "SECRET_KEY" => Some("integration-test-secret".into()),
        "API_BASE_URL" => Some("http://api.test".into()),
        _ => None,
    })
    .expect("config")
}

fn app_with(config: ApiConfig) -> Router {
    let store = Arc::new(MemoryAccountStore::new());
    accord_api::router(AppState::new(config, store).expect("state"))
}

fn app() -> Router {
    app_with(config())
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request")
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("parse JSON")
}

#[tokio::test]
async fn health_is_always_ok() {
    let resp = send(&app(), get("/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn signup_login_and_lookup_scenario() {
    let app = app();

    let resp = send(&app, form("/signup", "username=jdoe&password=hunter2")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = body_json(resp).await;
    assert_eq!(token["token_type"], "bearer");
    let access = token["access_token"].as_str().expect("access_token").to_string();

    let resp = send(&app, bearer("/accounts/me", &access)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let claims = body_json(resp).await;
    assert_eq!(claims["username"], "jdoe");

    let resp = send(&app, get(&format!("/accounts/{}", claims["sub"].as_str().unwrap()))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["username"], "jdoe");

    let resp = send(&app, form("/signup", "username=jdoe&password=hunter2")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(resp).await["detail"],
        "Submitted credentials already exist"
    );

    let resp = send(&app, form("/login", "username=jdoe&password=wrong")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let resp = send(&app, get("/accounts/999999")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["detail"], "Account not found");
}

#[tokio::test]
async fn token_endpoint_accepts_password_grant_form() {
    let app = app();
    send(&app, form("/signup", "username=jdoe&password=hunter2&email=jdoe%40example.com")).await;

    let resp = send(
        &app,
        form("/token", "grant_type=password&username=jdoe&password=hunter2&scope="),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn unknown_username_and_wrong_password_look_the_same() {
    let app = app();
    send(&app, form("/signup", "username=jdoe&password=hunter2")).await;

    let wrong = send(&app, form("/login", "username=jdoe&password=nope")).await;
    let unknown = send(&app, form("/login", "username=ghost&password=hunter2")).await;
    assert_eq!(wrong.status(), unknown.status());
    assert_eq!(body_json(wrong).await, body_json(unknown).await);
}

#[tokio::test]
async fn me_requires_valid_bearer_token() {
    let app = app();
    let resp = send(&app, get("/accounts/me")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&app, bearer("/accounts/me", "not-a-token")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

fn authed_json(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Sign `username` up with password `hunter2`; returns `(id, access token)`.
async fn signup(app: &Router, username: &str) -> (i64, String) {
    let resp = send(
        app,
        form(
            "/signup",
            &format!("username={username}&password=hunter2&email={username}%40example.com"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let access = body_json(resp).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let me = body_json(send(app, bearer("/accounts/me", &access)).await).await;
    let id = me["sub"].as_str().unwrap().parse().unwrap();
    (id, access)
}

#[tokio::test]
async fn disabling_an_account_blocks_login_and_live_tokens() {
    let app = app();
    let (id, access) = signup(&app, "jdoe").await;

    let resp = send(
        &app,
        authed_json("PATCH", &format!("/accounts/{id}"), &access, serde_json::json!({"disabled": true})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["disabled"], true);

    let resp = send(&app, form("/login", "username=jdoe&password=hunter2")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = send(&app, form("/login", "username=jdoe&password=wrong")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&app, bearer("/accounts/me", &access)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_crud() {
    let app = app();

    let resp = send(
        &app,
        json(
            "POST",
            "/accounts",
            serde_json::json!({"username": "jane", "email": "jane@example.com"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert!(created["id"].is_i64());
    assert!(created.get("hashed_password").is_none());

    let resp = send(
        &app,
        json(
            "POST",
            "/accounts",
            serde_json::json!({"username": "jane", "email": "other@example.com"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["detail"], "Username unavailable");

    let (id, access) = signup(&app, "john").await;
    let resp = send(
        &app,
        authed_json(
            "PATCH",
            &format!("/accounts/{id}"),
            &access,
            serde_json::json!({"email": "john@work.example.com"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let patched = body_json(resp).await;
    assert_eq!(patched["email"], "john@work.example.com");
    assert_eq!(patched["username"], "john");

    let resp = send(
        &app,
        authed_json("PATCH", &format!("/accounts/{id}"), &access, serde_json::json!({"email": "nope"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let list = body_json(send(&app, get("/accounts")).await).await;
    assert_eq!(list.as_array().unwrap().len(), 2);

    let uri = format!("/accounts/{id}");
    assert_eq!(send(&app, authed_delete(&uri, &access)).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::NOT_FOUND);
    // The token died with its account.
    assert_eq!(
        send(&app, authed_delete(&uri, &access)).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn account_changes_require_the_owner() {
    let app = app();
    let (victim, _) = signup(&app, "victim").await;
    let (_, mallory) = signup(&app, "mallory").await;
    let uri = format!("/accounts/{victim}");

    let resp = send(&app, json("PATCH", &uri, serde_json::json!({"password": "pwned"}))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let anonymous_delete = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, anonymous_delete).await.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &app,
        authed_json("PATCH", &uri, &mallory, serde_json::json!({"password": "pwned"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, authed_delete(&uri, &mallory)).await.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, form("/login", "username=victim&password=pwned")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = send(&app, form("/login", "username=victim&password=hunter2")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn patch_to_taken_username_conflicts() {
    let app = app();
    signup(&app, "jane").await;
    let (john, access) = signup(&app, "john").await;

    let resp = send(
        &app,
        authed_json("PATCH", &format!("/accounts/{john}"), &access, serde_json::json!({"username": "jane"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// -----------------------------------------------------------------------------
// Federated login
// -----------------------------------------------------------------------------

async fn github_app(server: &MockServer) -> Router {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "gho_test", "token_type": "bearer", "scope": "user:email"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"email": "octo@example.com", "primary": true, "verified": true}
        ])))
        .mount(server)
        .await;

    let mut reg = ProviderRegistration::github("gh-client", "gh-secret");
    reg.token_url = format!("{}/login/oauth/access_token", server.uri());
    reg.identity_url = format!("{}/user/emails", server.uri());
    let mut config = config();
    config.auth.providers = vec![reg];
    app_with(config)
}

/// Follow `GET /login/github` and return `(state, nonce cookie pair)`.
async fn start_login(app: &Router) -> (String, String) {
    let resp = send(app, get("/login/github")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let location = resp.headers()[header::LOCATION].to_str().unwrap();
    let location = url::Url::parse(location).unwrap();
    assert_eq!(location.host_str(), Some("github.com"));
    let state = location
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state param");
    assert!(
        location
            .query_pairs()
            .any(|(k, v)| k == "redirect_uri" && v == "http://api.test/auth/github")
    );

    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let pair = set_cookie.split(';').next().unwrap().to_string();
    assert_eq!(pair, format!("accord_oauth_nonce={state}"));
    (state, pair)
}

fn callback(state: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/auth/github?code=abc&state={state}"));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let app = app();
    assert_eq!(send(&app, get("/login/myspace")).await.status(), StatusCode::NOT_FOUND);
    // Known but unconfigured.
    assert_eq!(send(&app, get("/login/google")).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oauth_login_provisions_account_once() {
    let server = MockServer::start().await;
    let app = github_app(&server).await;

    for _ in 0..2 {
        let (state, cookie) = start_login(&app).await;
        let resp = send(&app, callback(&state, Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cleared = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.starts_with("accord_oauth_nonce=;"));
        assert!(cleared.contains("Max-Age=0"));
        let token = body_json(resp).await;
        assert!(token["access_token"].is_string());
    }

    let accounts = body_json(send(&app, get("/accounts")).await).await;
    let accounts = accounts.as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["username"], "octo@example.com");
    assert_eq!(accounts[0]["external_oauth"], true);
}

#[tokio::test]
async fn oauth_callback_without_session_cookie_is_rejected() {
    let server = MockServer::start().await;
    let app = github_app(&server).await;

    let (state, _cookie) = start_login(&app).await;
    let resp = send(&app, callback(&state, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn oauth_callback_replay_is_rejected() {
    let server = MockServer::start().await;
    let app = github_app(&server).await;

    let (state, cookie) = start_login(&app).await;
    assert_eq!(
        send(&app, callback(&state, Some(&cookie))).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(&app, callback(&state, Some(&cookie))).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn provider_token_error_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&server)
        .await;
    let mut reg = ProviderRegistration::github("gh-client", "gh-secret");
    reg.token_url = format!("{}/login/oauth/access_token", server.uri());
    let mut config = config();
    config.auth.providers = vec![reg];
    let app = app_with(config);

    let (state, cookie) = start_login(&app).await;
    let resp = send(&app, callback(&state, Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "provider_error");
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .contains("bad_verification_code")
    );
}

#[tokio::test]
async fn failed_profile_fetch_is_401() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "gho_x"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let mut reg = ProviderRegistration::github("gh-client", "gh-secret");
    reg.token_url = format!("{}/login/oauth/access_token", server.uri());
    reg.identity_url = format!("{}/user/emails", server.uri());
    let mut config = config();
    config.auth.providers = vec![reg];
    let app = app_with(config);

    let (state, cookie) = start_login(&app).await;
    let resp = send(&app, callback(&state, Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_error_without_pending_login_is_401() {
    let server = MockServer::start().await;
    let app = github_app(&server).await;

    let resp = send(&app, get("/auth/github?error=Your%20account%20is%20locked")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_credentials");
    assert!(!body["detail"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn provider_denial_after_login_redirect_is_500() {
    let server = MockServer::start().await;
    let app = github_app(&server).await;

    let (state, cookie) = start_login(&app).await;
    let req = Request::builder()
        .uri(format!("/auth/github?error=access_denied&state={state}"))
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["detail"], "access_denied");
}

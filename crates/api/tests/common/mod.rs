#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use nvoi_api::auth::session::{
    encode_session, SessionConfig, SessionData, SessionUser, SESSION_MAX_AGE_SECS,
};
use nvoi_api::config::ServerConfig;
use nvoi_api::oauth::anthropic;
use nvoi_api::oauth::{ClientCredentials, OAuthConfig};
use nvoi_api::relay::{NotificationRelay, RelayHub};
use nvoi_api::router::build_app_router;
use nvoi_api::services::accounts;
use nvoi_api::state::AppState;
use nvoi_db::models::user::User;
use nvoi_events::EventBus;
use nvoi_worker::{JobProcessor, JobQueue, QueueConsumer, SimulatedWork, WorkerConfig};

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Build a test `ServerConfig` with safe defaults.
///
/// GitHub is the only configured login provider.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "http://localhost:3000".to_string(),
        session: SessionConfig {
            secret: "integration-test-secret-with-enough-entropy".to_string(),
            secure: false,
            max_age_secs: SESSION_MAX_AGE_SECS,
        },
        oauth: OAuthConfig {
            github: Some(ClientCredentials {
                client_id: "gh-client".to_string(),
                client_secret: "gh-secret".to_string(),
            }),
            google: None,
            auth0: None,
            redirect_base: "http://localhost:3000".to_string(),
            anthropic_token_url: anthropic::TOKEN_URL.to_string(),
        },
    }
}

/// The application plus handles into its background machinery.
pub struct TestApp {
    pub router: Router,
    pub relay_hub: Arc<RelayHub>,
    pub event_bus: Arc<EventBus>,
    pub config: ServerConfig,
}

/// Build the full application with the production middleware stack, a
/// running job consumer (no simulated delay) and the notification relay.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> TestApp {
    let event_bus = Arc::new(EventBus::default());
    let relay_hub = Arc::new(RelayHub::new());
    tokio::spawn(NotificationRelay::new(Arc::clone(&relay_hub)).run(event_bus.subscribe()));

    let (job_queue, receiver) = JobQueue::new();
    let processor =
        JobProcessor::new(pool.clone(), Arc::clone(&event_bus), SimulatedWork::new(0.0));
    let worker_config = WorkerConfig {
        concurrency: 4,
        max_retries: 0,
        work_delay_scale: 0.0,
    };
    let consumer = QueueConsumer::new(job_queue.clone(), receiver, processor, worker_config);
    tokio::spawn(consumer.run(CancellationToken::new()));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        relay_hub: Arc::clone(&relay_hub),
        event_bus: Arc::clone(&event_bus),
        job_queue,
        mailer: None,
        http: reqwest::Client::new(),
    };

    TestApp {
        router: build_app_router(state, &config),
        relay_hub,
        event_bus,
        config,
    }
}

pub fn build_test_harness(pool: PgPool) -> TestApp {
    build_test_app_with(pool, test_config())
}

/// Just the router, for tests that do not need the background handles.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_harness(pool).router
}

// ---------------------------------------------------------------------------
// Accounts and sessions
// ---------------------------------------------------------------------------

/// Register an email account (with its default workspace).
pub async fn create_user(pool: &PgPool, email: &str, name: Option<&str>) -> User {
    accounts::register_with_email(pool, email, TEST_PASSWORD, name)
        .await
        .expect("registration should succeed")
}

/// A `Cookie` header value carrying a valid session for `user`.
pub fn session_cookie_for(user: &User) -> String {
    let data = SessionData::for_user(SessionUser::from(user));
    let token = encode_session(&data, &test_config().session).expect("session should encode");
    format!("__session={token}")
}

/// The `name=value` part of the response's `Set-Cookie`, usable as a
/// `Cookie` header on the next request.
pub fn response_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_with_cookie(app: Router, uri: &str, cookie: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

/// POST `application/x-www-form-urlencoded` fields.
pub async fn post_form(
    app: Router,
    uri: &str,
    fields: &[(&str, &str)],
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder =
        Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    send(app, builder.body(Body::from(encode_form(fields))).unwrap()).await
}

pub async fn delete_with_cookie(app: Router, uri: &str, cookie: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location<B>(response: &Response<B>) -> &str {
    response.headers()["location"].to_str().unwrap()
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    let mut url = reqwest::Url::parse("http://form.invalid/").unwrap();
    url.query_pairs_mut().extend_pairs(fields);
    url.query().unwrap_or_default().to_string()
}

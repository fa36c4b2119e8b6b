mod chat;
mod genome;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use genome_chat::{ChatManager, SessionError};
use genome_core::ValidationError;
use genome_llm::ProviderError;
use serde::Serialize;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::jobs::JobRunner;
use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobRunner,
}

impl AppState {
    #[must_use]
    pub fn new(jobs: JobRunner) -> Self {
        Self { jobs }
    }

    pub(crate) fn chat(&self) -> &ChatManager {
        &self.jobs.chat
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    active_sessions: usize,
    jobs: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: &str, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id.to_owned()),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "session_expired" => StatusCode::GONE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "upstream_timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_validation_error(request_id: &str, error: &ValidationError) -> ApiError {
    ApiError::new(request_id, "validation_error", error.to_string())
}

pub(super) fn map_session_error(request_id: &str, error: &SessionError) -> ApiError {
    match error {
        SessionError::Validation(e) => map_validation_error(request_id, e),
        SessionError::UnknownSession(_) => ApiError::new(request_id, "not_found", error.to_string()),
        SessionError::Expired(_) => ApiError::new(request_id, "session_expired", error.to_string()),
        SessionError::Template(e) => {
            tracing::error!(error = %e, "prompt template failed to render");
            ApiError::new(request_id, "internal_error", "failed to build the prompt")
        }
        SessionError::Provider(e) => map_provider_error(request_id, e),
    }
}

fn map_provider_error(request_id: &str, error: &ProviderError) -> ApiError {
    tracing::warn!(error = %error, "completion provider call failed");
    match error {
        ProviderError::RateLimited { .. } => ApiError::new(
            request_id,
            "rate_limited",
            "the AI provider is busy, try again shortly",
        ),
        ProviderError::Timeout { .. } => ApiError::new(
            request_id,
            "upstream_timeout",
            "the AI provider did not answer in time",
        ),
        _ => ApiError::new(
            request_id,
            "upstream_error",
            "the AI provider could not complete the request",
        ),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/genome",
            get(genome::list_jobs).post(genome::create_job),
        )
        .route("/api/v1/genome/{job_id}", get(genome::get_job))
        .route("/api/v1/genome/{job_id}/report", get(genome::get_report))
        .route(
            "/api/v1/genome/{job_id}/redeliver",
            post(genome::redeliver),
        )
        .route("/api/v1/chat", post(chat::send_message))
        .route("/api/v1/chat/report", post(chat::request_report))
        .route(
            "/api/v1/chat/sessions",
            get(chat::list_sessions).post(chat::create_session),
        )
        .route(
            "/api/v1/chat/sessions/{session_id}",
            axum::routing::delete(chat::end_session),
        )
        .route(
            "/api/v1/chat/sessions/{session_id}/history",
            get(chat::history),
        )
        .route(
            "/api/v1/chat/sessions/{session_id}/export",
            get(chat::export),
        )
        .route(
            "/api/v1/chat/sessions/{session_id}/reset",
            post(chat::reset),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let data = HealthData {
        status: "ok",
        active_sessions: state.chat().store().len().await,
        jobs: state.jobs.jobs.list().await.len(),
    };
    (StatusCode::OK, ApiResponse::new(&req_id.0, data))
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{state_with, StubProvider};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        build_app(state, AuthState::disabled(), default_rate_limit_state())
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json parse")
        };
        (status, json)
    }

    async fn open_session(app: &Router, brand: &str) -> String {
        let (status, json) = call(
            app,
            Method::POST,
            "/api/v1/chat/sessions",
            Some(json!({ "brand": brand })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        json["data"]["session_id"]
            .as_str()
            .expect("session id")
            .to_string()
    }

    #[test]
    fn api_error_session_expired_maps_to_gone() {
        let response = ApiError::new("req-1", "session_expired", "expired").into_response();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[test]
    fn provider_timeout_maps_to_gateway_timeout() {
        let error = SessionError::Provider(ProviderError::Timeout { after_ms: 10 });
        let response = map_session_error("req-1", &error).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn provider_auth_maps_to_bad_gateway() {
        let error = SessionError::Provider(ProviderError::Auth("bad key".to_string()));
        let response = map_session_error("req-1", &error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn health_is_public_and_reports_counts() {
        let auth = AuthState::from_keys("secret", false).expect("auth");
        let app = build_app(state_with(StubProvider::ok()), auth, default_rate_limit_state());

        let (status, json) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["active_sessions"], 0);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let auth = AuthState::from_keys("secret", false).expect("auth");
        let app = build_app(state_with(StubProvider::ok()), auth, default_rate_limit_state());

        let (status, _) = call(&app, Method::GET, "/api/v1/chat/sessions", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/chat/sessions")
            .header(header::AUTHORIZATION, "Bearer secret")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn call_as(app: &Router, token: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("x-request-id", "req-7")
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json parse"))
    }

    #[tokio::test]
    async fn auth_failure_uses_the_error_envelope() {
        let auth = AuthState::from_keys("secret", false).expect("auth");
        let app = build_app(state_with(StubProvider::ok()), auth, default_rate_limit_state());

        let (status, json) = call_as(&app, "wrong", "/api/v1/chat/sessions").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
        assert_eq!(json["meta"]["request_id"], "req-7");
    }

    #[tokio::test]
    async fn rate_limit_applies_per_token() {
        let auth = AuthState::from_keys("alpha,beta", false).expect("auth");
        let limit = RateLimitState::new(1, Duration::from_secs(60));
        let app = build_app(state_with(StubProvider::ok()), auth, limit);

        let (status, _) = call_as(&app, "alpha", "/api/v1/chat/sessions").await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call_as(&app, "alpha", "/api/v1/chat/sessions").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["meta"]["request_id"], "req-7");

        let (status, _) = call_as(&app, "beta", "/api/v1/chat/sessions").await;
        assert_eq!(status, StatusCode::OK, "other clients keep their own budget");

        let (status, _) = call_as(&app, "mallory", "/api/v1/chat/sessions").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let app = app(state_with(StubProvider::ok()));
        let request = Request::builder()
            .uri("/api/v1/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
    }

    #[tokio::test]
    async fn chat_turn_records_history() {
        let app = app(state_with(StubProvider::ok()));
        let session_id = open_session(&app, "acme").await;

        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(json!({ "session_id": session_id, "message": "create an image of a logo" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["result"]["type"], "image_asset");
        assert_eq!(
            json["data"]["result"]["image"]["url"],
            "https://img.example/stub.png"
        );

        let (status, json) = call(
            &app,
            Method::GET,
            &format!("/api/v1/chat/sessions/{session_id}/history"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let history = json["data"].as_array().expect("history array");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[1]["role"], "assistant");
    }

    #[tokio::test]
    async fn report_requests_are_flagged_on_the_reply() {
        let app = app(state_with(StubProvider::ok()));
        let session_id = open_session(&app, "acme").await;

        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(json!({ "session_id": session_id, "message": "Please send report to my inbox" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["needs_report"], true);

        let (_, json) = call(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(json!({ "session_id": session_id, "message": "how are we doing?" })),
        )
        .await;
        assert_eq!(json["data"]["needs_report"], false);
    }

    #[tokio::test]
    async fn blank_chat_message_is_a_validation_error() {
        let app = app(state_with(StubProvider::ok()));
        let session_id = open_session(&app, "acme").await;

        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(json!({ "session_id": session_id, "message": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn unknown_session_asks_for_restart() {
        let app = app(state_with(StubProvider::ok()));
        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(json!({ "session_id": uuid::Uuid::new_v4(), "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let message = json["error"]["message"].as_str().expect("message");
        assert!(message.contains("please restart the conversation"));
    }

    #[tokio::test]
    async fn ending_a_session_returns_its_export() {
        let app = app(state_with(StubProvider::ok()));
        let session_id = open_session(&app, "acme").await;

        let (status, json) = call(
            &app,
            Method::DELETE,
            &format!("/api/v1/chat/sessions/{session_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["session_id"], session_id.as_str());

        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/v1/chat/sessions/{session_id}/history"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn genome_request_rejects_bad_email() {
        let app = app(state_with(StubProvider::ok()));
        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/genome",
            Some(json!({ "brand_identifier": "acme", "email": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn genome_request_is_accepted_and_completes() {
        let state = state_with(StubProvider::ok());
        let app = app(state.clone());
        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/genome",
            Some(json!({ "brand_identifier": "acme", "email": "owner@acme.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["data"]["status"], "pending");
        let job_id = json["data"]["job_id"].as_str().expect("job id").to_string();

        let mut last = Value::Null;
        for _ in 0..50 {
            let (_, json) = call(&app, Method::GET, &format!("/api/v1/genome/{job_id}"), None).await;
            last = json;
            if last["data"]["status"] == "completed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last["data"]["status"], "completed");

        let (status, json) = call(
            &app,
            Method::GET,
            &format!("/api/v1/genome/{job_id}/report"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["facets"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn redeliver_requires_a_failed_delivery() {
        let state = state_with(StubProvider::ok());
        let job = state.jobs.jobs.create("acme", "owner@acme.com", None).await;
        let app = app(state);

        let (status, json) = call(
            &app,
            Method::POST,
            &format!("/api/v1/genome/{}/redeliver", job.job_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let app = app(state_with(StubProvider::ok()));
        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/v1/genome/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// src/server.rs
// =============================================================================
// HTTP front end for the analyzer (the `serve` subcommand).
//
// Routes:
//   GET  /health  -> {"status": "ok", "version": "..."}
//   GET  /pages   -> every record cached in the caller's session
//   POST /pages   -> analyze {"url": "..."} (or return the cached record)
//
// Sessions are picked by the `x-session-id` header. Only POST creates a
// session: an unknown or missing id on POST starts a new one, and every POST
// answer carries the id in use. GET for an unknown id answers `{}` without
// creating anything.
// =============================================================================

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::analyzer::Analyzer;
use crate::error::AnalyzeError;
use crate::session::Session;

pub const SESSION_HEADER: &str = "x-session-id";

type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    sessions: Arc<Mutex<HashMap<String, SharedSession>>>,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // Looks up the session named by the `x-session-id` header, if the server knows it
    async fn find_session(&self, headers: &HeaderMap) -> Option<(String, SharedSession)> {
        let id = requested_session_id(headers)?;
        let sessions = self.sessions.lock().await;
        let session = Arc::clone(sessions.get(&id)?);
        Some((id, session))
    }

    // Finds the caller's session, or creates one under a fresh id
    //
    // The registry lock is released before the caller touches the session.
    async fn find_or_create_session(&self, headers: &HeaderMap) -> (String, SharedSession) {
        let requested = requested_session_id(headers);
        let mut sessions = self.sessions.lock().await;

        if let Some(id) = requested {
            if let Some(session) = sessions.get(&id) {
                return (id, Arc::clone(session));
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(Session::new()));
        sessions.insert(id.clone(), Arc::clone(&session));
        info!("Started session {}", id);
        (id, session)
    }
}

fn requested_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        match err {
            AnalyzeError::InvalidUrl { .. } => ApiError::BadRequest(err.to_string()),
            AnalyzeError::Network { .. } => ApiError::Upstream(err.to_string()),
            AnalyzeError::Client(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        error!(code = self.error_code(), "API error ({}): {}", status.as_u16(), self);

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pages", get(list_pages).post(analyze_page))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Unknown callers get an empty listing; no session is created for them
async fn list_pages(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.find_session(&headers).await {
        Some((id, session)) => {
            let pages = session.lock().await.pages().clone();
            ([(SESSION_HEADER, id)], Json(pages)).into_response()
        }
        None => Json(json!({})).into_response(),
    }
}

async fn analyze_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let (id, session) = state.find_or_create_session(&headers).await;

    let result = async {
        // Bad JSON or a missing content-type gets our error body, not axum's plain text
        let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        let payload = match body {
            Value::Object(payload) => payload,
            _ => return Err(ApiError::BadRequest("Body must be a JSON object".to_string())),
        };
        let url = payload
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Missing string field 'url'".to_string()))?;

        // Held for the whole analysis: one URL is never analyzed twice per session
        let mut session = session.lock().await;
        let record = session.get_or_analyze(&state.analyzer, &url, payload).await?;
        Ok::<_, ApiError>(record)
    }
    .await;

    match result {
        Ok(record) => ([(SESSION_HEADER, id)], Json(record)).into_response(),
        Err(err) => ([(SESSION_HEADER, id)], err).into_response(),
    }
}

// Binds `addr` and serves until the process is stopped
pub async fn serve(addr: &str, analyzer: Analyzer) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(AppState::new(analyzer))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_app() -> Router {
        let analyzer = Analyzer::new(&AnalyzerConfig::default()).unwrap();
        router(AppState::new(analyzer))
    }

    fn post_pages(session_id: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/pages")
            .header("content-type", "application/json");
        if let Some(id) = session_id {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_pages(session_id: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/pages");
        if let Some(id) = session_id {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn session_id(response: &Response) -> String {
        response.headers()[SESSION_HEADER].to_str().unwrap().to_string()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn anonymous_listing_is_empty_and_creates_no_session() {
        let analyzer = Analyzer::new(&AnalyzerConfig::default()).unwrap();
        let state = AppState::new(analyzer);
        let app = router(state.clone());

        let response = app.clone().oneshot(get_pages(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SESSION_HEADER).is_none());
        assert_eq!(body_json(response).await, json!({}));

        let response = app.oneshot(get_pages(Some("stale-id"))).await.unwrap();
        assert!(response.headers().get(SESSION_HEADER).is_none());
        assert_eq!(body_json(response).await, json!({}));

        assert!(state.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn repeated_post_is_served_from_session() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<!DOCTYPE html><title>Served</title><a href=\"/a\">a</a>"),
            )
            .expect(1)
            .mount(&upstream)
            .await;

        let app = test_app();
        let url = upstream.uri();

        let first = app
            .clone()
            .oneshot(post_pages(None, json!({ "url": url })))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let id = session_id(&first);
        let first_body = body_json(first).await;

        let second = app
            .clone()
            .oneshot(post_pages(Some(&id), json!({ "url": url })))
            .await
            .unwrap();
        assert_eq!(session_id(&second), id);
        let second_body = body_json(second).await;

        assert_eq!(first_body, second_body);
        assert_eq!(first_body["title"], "Served");
        assert_eq!(first_body["internal_link_count"], 1);

        let listing = app.oneshot(get_pages(Some(&id))).await.unwrap();
        let pages = body_json(listing).await;
        assert_eq!(pages[url.as_str()], first_body);
    }

    #[tokio::test]
    async fn http_error_page_is_a_normal_record() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&upstream)
            .await;

        let response = test_app()
            .oneshot(post_pages(None, json!({ "url": upstream.uri() })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["error_message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn missing_url_is_bad_request() {
        let response = test_app()
            .oneshot(post_pages(None, json!({ "link": "http://example.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unreachable_page_is_bad_gateway() {
        let response = test_app()
            .oneshot(post_pages(None, json!({ "url": "http://127.0.0.1:1/" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn post_with_unknown_session_id_starts_a_new_session() {
        let response = test_app()
            .oneshot(post_pages(Some("stale-id"), json!({ "link": "x" })))
            .await
            .unwrap();
        let id = session_id(&response);
        assert!(!id.is_empty());
        assert_ne!(id, "stale-id");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request_with_session_header() {
        let request = Request::builder()
            .method("POST")
            .uri("/pages")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!session_id(&response).is_empty());
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/pages")
            .body(Body::from(r#"{"url": "http://example.com"}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!session_id(&response).is_empty());
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn non_object_body_is_bad_request() {
        let response = test_app()
            .oneshot(post_pages(None, json!(["http://example.com"])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }
}

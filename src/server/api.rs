//! Handlers for `/api/*`.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::AppState;
use crate::assistant::Assistant;
use crate::session::ChatSession;

const TIMEOUT_APOLOGY: &str =
    "Pepani, panali vuto. Chonde yesani kwa nthawi. (Sorry, there was an error. Please try again.)";

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    message: String,
    /// Kept as text so a malformed id opens a new session instead of
    /// failing the request.
    #[serde(default)]
    session_id: Option<String>,
}

fn json_error(status: StatusCode, code: &str, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({ "error": code, "message": message.to_string() })),
    )
        .into_response()
}

fn unknown_session(id: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("unknown session {id}"))
}

/// Resolves a path id to a live session; malformed ids are simply unknown.
async fn lookup<A>(state: &AppState<A>, id: &str) -> Option<Arc<Mutex<ChatSession>>> {
    let id = Uuid::parse_str(id).ok()?;
    state.session(id).await
}

/// GET /api/health
pub(super) async fn health<A>(State(state): State<AppState<A>>) -> Response {
    let sessions = state.sessions.lock().await.len();
    Json(json!({
        "status": "ok",
        "approach": state.approach,
        "sessions": sessions,
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// POST /api/chat
pub(super) async fn chat<A>(
    State(state): State<AppState<A>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response
where
    A: Assistant + Send + Sync + 'static,
{
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return json_error(rejection.status(), "invalid_request", rejection.body_text());
        }
    };
    let message = req.message.trim();
    if message.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "empty_message", "message must not be empty");
    }

    let requested = req.session_id.as_deref().and_then(|id| Uuid::parse_str(id).ok());
    let handle = state.session_or_new(requested).await;
    let mut session = handle.lock().await;
    let session_id = session.id;

    let outcome = tokio::time::timeout(state.turn_timeout, session.ask(state.assistant.as_ref(), message)).await;
    match outcome {
        Ok(Ok(reply)) => Json(json!({
            "session_id": session_id,
            "answer": reply.answer,
            "sources": reply.sources,
            "query_type": reply.query_type,
        }))
        .into_response(),
        Ok(Err(limited)) => {
            warn!(session = %session_id, %limited, "query refused");
            json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", limited)
        }
        Err(_) => {
            warn!(session = %session_id, "chat turn timed out");
            session.abandon_turn(TIMEOUT_APOLOGY);
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({
                    "error": "timeout",
                    "message": TIMEOUT_APOLOGY,
                    "session_id": session_id,
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/sessions/{id}/usage
pub(super) async fn usage<A>(State(state): State<AppState<A>>, Path(id): Path<String>) -> Response {
    match lookup(&state, &id).await {
        Some(handle) => Json(handle.lock().await.usage()).into_response(),
        None => unknown_session(&id),
    }
}

/// GET /api/sessions/{id}/history
pub(super) async fn history<A>(State(state): State<AppState<A>>, Path(id): Path<String>) -> Response {
    match lookup(&state, &id).await {
        Some(handle) => Json(handle.lock().await.history().to_vec()).into_response(),
        None => unknown_session(&id),
    }
}

/// DELETE /api/sessions/{id}
pub(super) async fn clear<A>(State(state): State<AppState<A>>, Path(id): Path<String>) -> Response {
    match lookup(&state, &id).await {
        Some(handle) => {
            handle.lock().await.clear();
            StatusCode::NO_CONTENT.into_response()
        }
        None => unknown_session(&id),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::Reply;
    use crate::assistant::mock::EchoAssistant;
    use crate::server::build_router;

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_chat(body: Value) -> Request<Body> {
        Request::post("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn router() -> axum::Router {
        build_router(AppState::new(EchoAssistant::default(), "rag"))
    }

    #[tokio::test]
    async fn health_reports_approach() {
        let (status, body) = send(&router(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["approach"], "rag");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn chat_opens_session_and_reuses_it() {
        let router = router();
        let (status, first) = send(&router, post_chat(json!({ "message": "Moni" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["answer"], "echo: Moni");
        assert_eq!(first["sources"], json!(["echo.txt"]));
        assert_eq!(first["query_type"], "relevant");

        let id = first["session_id"].as_str().unwrap().to_string();
        let (_, second) = send(
            &router,
            post_chat(json!({ "message": "Zikomo", "session_id": id })),
        )
        .await;
        assert_eq!(second["session_id"], id.as_str());

        let (status, usage) = send(&router, get(&format!("/api/sessions/{id}/usage"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(usage["session_queries"], 2);
        assert_eq!(usage["hourly_limit"], 10);

        let (_, history) = send(&router, get(&format!("/api/sessions/{id}/history"))).await;
        assert_eq!(history.as_array().map(Vec::len), Some(4));
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[3]["content"], "echo: Zikomo");
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let (status, body) = send(&router(), post_chat(json!({ "message": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "empty_message");
    }

    #[tokio::test]
    async fn hourly_limit_returns_429_with_chichewa_message() {
        let router = router();
        let (_, first) = send(&router, post_chat(json!({ "message": "q0" }))).await;
        let id = first["session_id"].as_str().unwrap().to_string();
        for i in 1..10 {
            let (status, _) = send(
                &router,
                post_chat(json!({ "message": format!("q{i}"), "session_id": id })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &router,
            post_chat(json!({ "message": "one more", "session_id": id })),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "rate_limited");
        assert!(body["message"].as_str().unwrap().contains("10 mafunso pa ola"));
    }

    #[tokio::test]
    async fn delete_clears_session_quota() {
        let router = router();
        let (_, first) = send(&router, post_chat(json!({ "message": "Moni" }))).await;
        let id = first["session_id"].as_str().unwrap().to_string();

        let request = Request::delete(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, usage) = send(&router, get(&format!("/api/sessions/{id}/usage"))).await;
        assert_eq!(usage["session_queries"], 0);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let id = uuid::Uuid::new_v4();
        let (status, body) = send(&router(), get(&format!("/api/sessions/{id}/usage"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let request = Request::delete(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    struct SlowAssistant;

    impl Assistant for SlowAssistant {
        async fn reply(&self, _query: &str) -> Reply {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Reply {
                answer: String::new(),
                sources: Vec::new(),
                query_type: String::new(),
            }
        }
    }

    #[tokio::test]
    async fn slow_turn_times_out_with_apology() {
        let state = AppState::new(SlowAssistant, "spe").with_turn_timeout(Duration::from_millis(10));
        let (status, body) = send(&build_router(state), post_chat(json!({ "message": "Moni" }))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "timeout");
        assert!(body["message"].as_str().unwrap().starts_with("Pepani"));
    }

    #[tokio::test]
    async fn timed_out_turn_consumes_quota_and_is_logged() {
        let state = AppState::new(SlowAssistant, "spe").with_turn_timeout(Duration::from_millis(10));
        let router = build_router(state);
        let (status, body) = send(&router, post_chat(json!({ "message": "Moni" }))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        let id = body["session_id"].as_str().unwrap().to_string();

        let (_, usage) = send(&router, get(&format!("/api/sessions/{id}/usage"))).await;
        assert_eq!(usage["session_queries"], 1);
        assert_eq!(usage["hourly_queries"], 1);

        let (_, history) = send(&router, get(&format!("/api/sessions/{id}/history"))).await;
        assert_eq!(history.as_array().map(Vec::len), Some(2));
        assert_eq!(history[0]["content"], "Moni");
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], TIMEOUT_APOLOGY);
    }

    #[tokio::test]
    async fn malformed_session_id_opens_new_session() {
        let (status, body) = send(
            &router(),
            post_chat(json!({ "message": "Moni", "session_id": "abc" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["session_id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(body["answer"], "echo: Moni");
    }

    #[tokio::test]
    async fn malformed_path_id_is_not_found() {
        let router = router();
        for uri in ["/api/sessions/abc/usage", "/api/sessions/abc/history"] {
            let (status, body) = send(&router, get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "not_found");
            assert_eq!(body["message"], "unknown session abc");
        }

        let request = Request::delete("/api/sessions/abc").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn malformed_json_gets_json_error_body() {
        let request = Request::post("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert!(body["message"].is_string());

        let (status, body) = send(&router(), post_chat(json!({ "session_id": "x" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let state = AppState::new(EchoAssistant::default(), "rag").with_idle_timeout(Duration::from_millis(200));
        let router = build_router(state);
        for i in 0..5 {
            let (status, _) = send(&router, post_chat(json!({ "message": format!("q{i}") }))).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, health) = send(&router, get("/api/health")).await;
        assert_eq!(health["sessions"], 5);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let (_, fresh) = send(&router, post_chat(json!({ "message": "Moni" }))).await;
        let (_, health) = send(&router, get("/api/health")).await;
        assert_eq!(health["sessions"], 1);

        let id = fresh["session_id"].as_str().unwrap();
        let (status, _) = send(&router, get(&format!("/api/sessions/{id}/usage"))).await;
        assert_eq!(status, StatusCode::OK);
    }
}

//! JSON chat API over axum.
//!
//! ```text
//! GET    /api/health
//! POST   /api/chat
//! GET    /api/sessions/{id}/usage
//! GET    /api/sessions/{id}/history
//! DELETE /api/sessions/{id}
//! ```

mod api;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::{delete, get, post};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::session::ChatSession;

/// Upper bound on one chat turn (translate, classify, retrieve, generate, translate).
pub const TURN_TIMEOUT: Duration = Duration::from_secs(120);

/// Sessions untouched for this long are dropped on the next session open.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 3600);

struct SessionEntry {
    handle: Arc<Mutex<ChatSession>>,
    last_seen: Instant,
}

type Sessions = Arc<Mutex<HashMap<Uuid, SessionEntry>>>;

/// Router state. Cheap to clone; the assistant and session map are shared.
pub struct AppState<A> {
    pub assistant: Arc<A>,
    pub approach: &'static str,
    sessions: Sessions,
    turn_timeout: Duration,
    idle_timeout: Duration,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            assistant: Arc::clone(&self.assistant),
            approach: self.approach,
            sessions: Arc::clone(&self.sessions),
            turn_timeout: self.turn_timeout,
            idle_timeout: self.idle_timeout,
        }
    }
}

impl<A> AppState<A> {
    pub fn new(assistant: A, approach: &'static str) -> Self {
        Self {
            assistant: Arc::new(assistant),
            approach,
            sessions: Arc::default(),
            turn_timeout: TURN_TIMEOUT,
            idle_timeout: SESSION_IDLE_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    #[cfg(test)]
    fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    async fn session(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.handle))
    }

    /// Looks up `id`, or opens a new session when it is absent or unknown.
    /// Idle sessions are evicted first.
    async fn session_or_new(&self, id: Option<Uuid>) -> Arc<Mutex<ChatSession>> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.idle_timeout);
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "idle sessions dropped");
        }

        if let Some(entry) = id.and_then(|id| sessions.get_mut(&id)) {
            entry.last_seen = now;
            return Arc::clone(&entry.handle);
        }
        let session = ChatSession::new();
        let id = session.id;
        info!(session = %id, "session opened");
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(
            id,
            SessionEntry {
                handle: Arc::clone(&handle),
                last_seen: now,
            },
        );
        handle
    }
}

pub fn build_router<A>(state: AppState<A>) -> Router
where
    A: Assistant + Send + Sync + 'static,
{
    Router::new()
        .route("/api/health", get(api::health::<A>))
        .route("/api/chat", post(api::chat::<A>))
        .route("/api/sessions/{id}/usage", get(api::usage::<A>))
        .route("/api/sessions/{id}/history", get(api::history::<A>))
        .route("/api/sessions/{id}", delete(api::clear::<A>))
        .with_state(state)
}

pub async fn serve<A>(state: AppState<A>, bind: &str) -> std::io::Result<()>
where
    A: Assistant + Send + Sync + 'static,
{
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, approach = state.approach, "chat API listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("chat API shut down");
    Ok(())
}

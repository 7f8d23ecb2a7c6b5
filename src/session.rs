//! Per-conversation state shared by the REPL and the HTTP surface.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::assistant::{Assistant, Reply};
use crate::openai::Role;

pub const MAX_QUERIES_PER_SESSION: usize = 20;
pub const MAX_QUERIES_PER_HOUR: usize = 10;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimited {
    #[error("Mwaposa muyeso wa mafunso mu session iyi ({limit} mafunso). Chonde yambitsaninso tsamba.")]
    Session { limit: usize },

    #[error(
        "Mwaposa muyeso wa mafunso pa ola ({limit} mafunso pa ola). Chonde yesani mu ola limene likubweralo."
    )]
    Hourly { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub session_queries: usize,
    pub session_limit: usize,
    pub hourly_queries: usize,
    pub hourly_limit: usize,
    pub session_minutes: u64,
}

/// Session cap plus a sliding hourly window. Every admitted query counts.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    session_limit: usize,
    hourly_limit: usize,
    window: Duration,
    session_count: usize,
    recent: VecDeque<Instant>,
    started: Instant,
}

impl RateLimiter {
    pub fn new(now: Instant) -> Self {
        Self::with_limits(MAX_QUERIES_PER_SESSION, MAX_QUERIES_PER_HOUR, RATE_LIMIT_WINDOW, now)
    }

    pub fn with_limits(
        session_limit: usize,
        hourly_limit: usize,
        window: Duration,
        now: Instant,
    ) -> Self {
        Self {
            session_limit,
            hourly_limit,
            window,
            session_count: 0,
            recent: VecDeque::new(),
            started: now,
        }
    }

    pub fn check(&mut self, now: Instant) -> Result<(), RateLimited> {
        if self.session_count >= self.session_limit {
            return Err(RateLimited::Session {
                limit: self.session_limit,
            });
        }
        self.prune(now);
        if self.recent.len() >= self.hourly_limit {
            return Err(RateLimited::Hourly {
                limit: self.hourly_limit,
            });
        }
        Ok(())
    }

    pub fn record(&mut self, now: Instant) {
        self.session_count += 1;
        self.recent.push_back(now);
    }

    pub fn usage(&self, now: Instant) -> UsageStats {
        UsageStats {
            session_queries: self.session_count,
            session_limit: self.session_limit,
            hourly_queries: self.recent.iter().filter(|t| self.in_window(**t, now)).count(),
            hourly_limit: self.hourly_limit,
            session_minutes: now.saturating_duration_since(self.started).as_secs() / 60,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.recent.front() {
            if self.in_window(oldest, now) {
                break;
            }
            self.recent.pop_front();
        }
    }

    fn in_window(&self, at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(at) < self.window
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    history: Vec<HistoryEntry>,
    limiter: RateLimiter,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_limiter(RateLimiter::new(Instant::now()))
    }

    pub fn with_limiter(limiter: RateLimiter) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            limiter,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn usage(&self) -> UsageStats {
        self.limiter.usage(Instant::now())
    }

    /// One turn. The query is counted and logged as soon as it is admitted,
    /// so a turn abandoned mid-answer still consumes quota. A refused query
    /// leaves history and quota untouched.
    pub async fn ask<A: Assistant + Sync>(
        &mut self,
        assistant: &A,
        query: &str,
    ) -> Result<Reply, RateLimited> {
        let now = Instant::now();
        self.limiter.check(now)?;
        self.limiter.record(now);
        self.history.push(HistoryEntry {
            role: Role::User,
            content: query.to_string(),
            sources: Vec::new(),
            query_type: None,
        });

        let reply = assistant.reply(query).await;
        self.history.push(HistoryEntry {
            role: Role::Assistant,
            content: reply.answer.clone(),
            sources: reply.sources.clone(),
            query_type: Some(reply.query_type.clone()),
        });
        Ok(reply)
    }

    /// Closes a turn that was abandoned before the assistant answered.
    pub fn abandon_turn(&mut self, apology: &str) {
        if self.history.last().is_some_and(|e| e.role == Role::User) {
            self.history.push(HistoryEntry {
                role: Role::Assistant,
                content: apology.to_string(),
                sources: Vec::new(),
                query_type: None,
            });
        }
    }

    /// Drops the conversation and starts a fresh quota.
    pub fn clear(&mut self) {
        info!(session = %self.id, turns = self.history.len() / 2, "session cleared");
        self.history.clear();
        self.limiter = RateLimiter::with_limits(
            self.limiter.session_limit,
            self.limiter.hourly_limit,
            self.limiter.window,
            Instant::now(),
        );
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

use chrono::{DateTime, Duration, Utc};
use rspotify::Token;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const SESSION_COOKIE: &str = "popfilter_session";
pub const LOGIN_COOKIE: &str = "popfilter_login";

/// How long a started login may take before its state is rejected.
const LOGIN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: Token,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Logged-in users, keyed by the id stored in their session cookie, plus the
/// OAuth `state` values of logins still waiting for their callback.
///
/// Only the Spotify token lives here. Handlers read it once per request and hand
/// it to the client explicitly.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    pending_logins: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self, token: Token) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.sessions.write().await.insert(
            id,
            Session {
                token,
                created_at: now,
                last_seen: now,
            },
        );

        info!("Started session {}", id);
        id
    }

    /// The stored token, or `AuthMissing` when there is no session or its token
    /// has expired and cannot be refreshed.
    pub async fn credential(&self, id: Uuid) -> Result<Token> {
        let mut sessions = self.sessions.write().await;

        let session = sessions.get_mut(&id).ok_or(AppError::AuthMissing)?;
        if session.token.is_expired() && session.token.refresh_token.is_none() {
            debug!("Session {} has an expired token", id);
            sessions.remove(&id);
            return Err(AppError::AuthMissing);
        }

        session.last_seen = Utc::now();
        Ok(session.token.clone())
    }

    /// Stores a token refreshed during a request. Ignored if the session ended meanwhile.
    pub async fn update_token(&self, id: Uuid, token: Token) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.token = token;
        }
    }

    pub async fn end(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Ended session {}", id);
        }
        removed
    }

    /// Drops sessions not used within `max_idle`, returning how many were removed.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, session| session.last_seen >= cutoff);

        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} idle sessions", pruned);
        }
        pruned
    }

    /// Issues a fresh OAuth `state` for one login attempt.
    pub async fn begin_login(&self) -> String {
        let state = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let cutoff = now - Duration::minutes(LOGIN_TTL_MINUTES);

        let mut pending = self.pending_logins.write().await;
        pending.retain(|_, started| *started >= cutoff);
        pending.insert(state.clone(), now);

        state
    }

    /// Consumes a login `state`. Each value is accepted once, and only within
    /// the login time limit.
    pub async fn complete_login(&self, state: &str) -> bool {
        let cutoff = Utc::now() - Duration::minutes(LOGIN_TTL_MINUTES);

        match self.pending_logins.write().await.remove(state) {
            Some(started) if started >= cutoff => true,
            Some(_) => {
                debug!("Login state expired");
                false
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Value of the named cookie in a `Cookie` header value.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Extracts our session id from a `Cookie` header value.
pub fn session_id_from_cookie(header: &str) -> Option<Uuid> {
    cookie_value(header, SESSION_COOKIE).and_then(|value| Uuid::parse_str(value).ok())
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Ties a pending login to the browser that started it.
pub fn login_cookie(state: &str) -> String {
    format!(
        "{}={}; Path=/callback; HttpOnly; SameSite=Lax; Max-Age={}",
        LOGIN_COOKIE,
        state,
        LOGIN_TTL_MINUTES * 60
    )
}

pub fn expired_login_cookie() -> String {
    format!("{}=; Path=/callback; HttpOnly; SameSite=Lax; Max-Age=0", LOGIN_COOKIE)
}

#[cfg(test)]
pub fn mock_token(expires_in_secs: i64, refresh_token: Option<&str>) -> Token {
    Token {
        access_token: "access".to_string(),
        expires_in: Duration::seconds(expires_in_secs),
        expires_at: Some(Utc::now() + Duration::seconds(expires_in_secs)),
        refresh_token: refresh_token.map(str::to_string),
        ..Default::default()
    }
}

//! Cookie sessions for the manager front-end.
//!
//! Sessions live in process memory and are lost on restart. Each carries the
//! signed-in user's roles and a CSRF token that state-changing forms must echo
//! back in the `_csrf` field. A session idle for longer than the store's TTL
//! is discarded on its next lookup.
//!
//! The login form has no session yet, so it uses a double-submit token: the
//! same value in the `MANAGER_LOGIN_CSRF` cookie and the form's `_csrf` field.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use catalogue_core::ManagerUser;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "MANAGER_SESSION";
pub const LOGIN_CSRF_COOKIE: &str = "MANAGER_LOGIN_CSRF";
pub const MANAGER_ROLE: &str = "MANAGER";

/// A signed-in user, stored as a request extension for protected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub roles: Vec<String>,
    pub csrf_token: String,
}

impl Session {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Compare a submitted `_csrf` value with this session's token.
    #[must_use]
    pub fn csrf_matches(&self, submitted: Option<&str>) -> bool {
        tokens_match(&self.csrf_token, submitted)
    }
}

/// Constant-time comparison of a submitted token with the expected one.
#[must_use]
pub fn tokens_match(expected: &str, submitted: Option<&str>) -> bool {
    submitted.is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
}

#[must_use]
pub fn new_csrf_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug)]
struct Entry {
    session: Session,
    last_seen: Instant,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl SessionStore {
    /// A store whose sessions expire after `ttl` without a request.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    /// Open a session for `user`, returning its id. Expired sessions are
    /// swept first.
    pub async fn create(&self, user: &ManagerUser) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session {
            username: user.username.clone(),
            roles: user.roles.clone(),
            csrf_token: new_csrf_token(),
        };

        let mut sessions = self.sessions.lock().await;
        let ttl = self.ttl;
        sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        sessions.insert(
            id.clone(),
            Entry {
                session,
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// The live session for `id`, refreshing its idle timer.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(id)?;
        if entry.last_seen.elapsed() >= self.ttl {
            sessions.remove(id);
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.remove(id).map(|entry| entry.session)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Find the user whose name and password match.
///
/// Runs exactly one bcrypt verification whether or not the name exists, so
/// response time does not reveal valid usernames. Blocking; call it off the
/// async runtime.
#[must_use]
pub fn authenticate<'a>(
    users: &'a [ManagerUser],
    username: &str,
    password: &str,
) -> Option<&'a ManagerUser> {
    let user = users.iter().find(|user| user.username == username);
    // Unknown names are checked against another user's hash and then discarded.
    let hash = user.or_else(|| users.first())?.password_hash.as_str();
    let verified = bcrypt::verify(password, hash).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored password hash could not be checked");
        false
    });
    user.filter(|_| verified)
}

/// Value of the cookie `name` from the request's `Cookie` headers.
#[must_use]
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then_some(value)
        })
}

/// Session id from the request's `Cookie` headers.
#[must_use]
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    cookie_value(headers, SESSION_COOKIE)
}

/// `Set-Cookie` value opening a session.
#[must_use]
pub fn session_cookie(id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// `Set-Cookie` value clearing the session cookie.
#[must_use]
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("MANAGER_SESSION=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// `Set-Cookie` value carrying the login form's CSRF token.
#[must_use]
pub fn login_csrf_cookie(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{LOGIN_CSRF_COOKIE}={token}; Path=/login; HttpOnly; SameSite=Strict"
    ))
    .ok()
}

#[must_use]
pub fn expired_login_csrf_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "MANAGER_LOGIN_CSRF=; Path=/login; HttpOnly; SameSite=Strict; Max-Age=0",
    )
}

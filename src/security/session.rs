//! Session persistence: the principal travels in an encrypted, signed cookie.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::MAX_SESSION_TIMEOUT_SECS;
use crate::error::WardenError;
use crate::security::principal::Principal;

pub const SESSION_COOKIE: &str = "WARDEN_SESSION";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub timeout: Duration,
    /// Mark the cookie `Secure`; off only for plain-HTTP development.
    pub secure: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    principal: Principal,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Active(Principal),
    /// A cookie was present but expired or unreadable.
    Stale,
}

pub fn read(jar: &PrivateCookieJar, now: DateTime<Utc>) -> SessionState {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return SessionState::Anonymous;
    };
    match serde_json::from_str::<SessionPayload>(cookie.value()) {
        Ok(payload) if payload.expires_at > now => SessionState::Active(payload.principal),
        Ok(payload) => {
            debug!(username = %payload.principal.username, "session expired");
            SessionState::Stale
        }
        Err(e) => {
            debug!(error = %e, "session cookie unreadable");
            SessionState::Stale
        }
    }
}

pub fn current_principal(jar: &PrivateCookieJar) -> Option<Principal> {
    match read(jar, Utc::now()) {
        SessionState::Active(principal) => Some(principal),
        SessionState::Anonymous | SessionState::Stale => None,
    }
}

/// Attach a fresh session for `principal`.
pub fn start(
    jar: PrivateCookieJar,
    principal: Principal,
    settings: &SessionSettings,
) -> Result<PrivateCookieJar, WardenError> {
    let expires_at = chrono::Duration::from_std(lifetime(settings))
        .ok()
        .and_then(|timeout| principal.authenticated_at.checked_add_signed(timeout))
        .unwrap_or(principal.authenticated_at);
    let payload = SessionPayload {
        expires_at,
        principal,
    };
    let value = serde_json::to_string(&payload)?;
    Ok(jar.add(build_cookie(value, settings)))
}

/// Session lifetime, capped at the longest timeout configuration accepts.
fn lifetime(settings: &SessionSettings) -> Duration {
    settings
        .timeout
        .min(Duration::from_secs(MAX_SESSION_TIMEOUT_SECS))
}

pub fn end(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie())
}

fn build_cookie(value: String, settings: &SessionSettings) -> Cookie<'static> {
    let max_age = i64::try_from(lifetime(settings).as_secs()).unwrap_or(i64::MAX);
    Cookie::build(Cookie::new(SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn clear_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn settings() -> SessionSettings {
        SessionSettings {
            timeout: Duration::from_secs(60),
            secure: true,
        }
    }

    fn principal() -> Principal {
        Principal::new("john", ["ROLE_EMPLOYEE".to_string()].into_iter().collect())
    }

    #[test]
    fn started_session_reads_back_until_expiry() {
        let jar = PrivateCookieJar::new(Key::generate());
        let jar = start(jar, principal(), &settings()).expect("session starts");

        match read(&jar, Utc::now()) {
            SessionState::Active(p) => assert_eq!(p.username, "john"),
            other => panic!("unexpected session state: {other:?}"),
        }

        let later = Utc::now() + chrono::Duration::seconds(61);
        assert_eq!(read(&jar, later), SessionState::Stale);
    }

    #[test]
    fn huge_timeout_is_capped_instead_of_overflowing() {
        let settings = SessionSettings {
            timeout: Duration::from_secs(10_000_000_000_000),
            secure: true,
        };
        let jar = PrivateCookieJar::new(Key::generate());
        let jar = start(jar, principal(), &settings).expect("session starts");

        match read(&jar, Utc::now() + chrono::Duration::days(300)) {
            SessionState::Active(p) => assert_eq!(p.username, "john"),
            other => panic!("unexpected session state: {other:?}"),
        }
        let past_cap = Utc::now() + chrono::Duration::days(366);
        assert_eq!(read(&jar, past_cap), SessionState::Stale);
    }

    #[test]
    fn no_cookie_is_anonymous() {
        let jar = PrivateCookieJar::new(Key::generate());
        assert_eq!(read(&jar, Utc::now()), SessionState::Anonymous);
        assert!(current_principal(&jar).is_none());
    }

    #[test]
    fn ended_session_is_anonymous() {
        let jar = PrivateCookieJar::new(Key::generate());
        let jar = start(jar, principal(), &settings()).expect("session starts");
        let jar = end(jar);
        assert!(current_principal(&jar).is_none());
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = build_cookie("x".to_string(), &settings());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(60)));
    }
}

use std::sync::OnceLock;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

/// Encoders selected by the `{id}` prefix of a stored password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderId {
    Bcrypt,
    Noop,
}

/// Verifies raw passwords against `{id}`-prefixed encoded values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelegatingPasswordEncoder;

impl DelegatingPasswordEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode with bcrypt at the given cost, prefixed with `{bcrypt}`.
    pub fn encode(&self, raw: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
        Ok(format!("{{bcrypt}}{}", bcrypt::hash(raw, cost)?))
    }

    /// Blocking check; bcrypt makes this CPU-heavy.
    pub fn matches(&self, raw: &str, encoded: &str) -> bool {
        let Some((id, hash)) = split_id(encoded) else {
            warn!("stored password has no recognised encoder id");
            return false;
        };
        match id {
            EncoderId::Bcrypt => match bcrypt::verify(raw, hash) {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(error = %e, "stored bcrypt hash is malformed");
                    false
                }
            },
            EncoderId::Noop => bool::from(raw.as_bytes().ct_eq(hash.as_bytes())),
        }
    }

    /// Runs [`Self::matches`] off the async executor.
    pub async fn verify(&self, raw: &str, encoded: &str) -> bool {
        let encoder = *self;
        let raw = raw.to_owned();
        let encoded = encoded.to_owned();
        match tokio::task::spawn_blocking(move || encoder.matches(&raw, &encoded)).await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "password verification task failed");
                false
            }
        }
    }

    /// Burn the same work as a real bcrypt check so unknown usernames take as
    /// long as wrong passwords.
    pub async fn verify_dummy(&self, raw: &str) {
        let encoder = *self;
        let raw = raw.to_owned();
        if let Err(e) = tokio::task::spawn_blocking(move || encoder.matches(&raw, dummy_hash())).await
        {
            error!(error = %e, "password verification task failed");
        }
    }
}

fn split_id(encoded: &str) -> Option<(EncoderId, &str)> {
    if let Some(rest) = encoded.strip_prefix('{') {
        let (id, hash) = rest.split_once('}')?;
        return match id {
            "bcrypt" => Some((EncoderId::Bcrypt, hash)),
            "noop" => Some((EncoderId::Noop, hash)),
            _ => None,
        };
    }
    if ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| encoded.starts_with(prefix))
    {
        return Some((EncoderId::Bcrypt, encoded));
    }
    None
}

/// Matches the cost stored hashes are usually created with.
const DUMMY_COST: u32 = 10;

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        bcrypt::hash("warden-timing-guard", DUMMY_COST)
            .map(|h| format!("{{bcrypt}}{h}"))
            .unwrap_or_else(|_| "{noop}".to_string())
    })
}

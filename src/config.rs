//! Service configuration read from the environment

use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LATENCY_MS: u64 = 1500;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Which responder produces assistant replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponderKind {
    /// Fixed-latency canned replies
    #[default]
    Canned,
    /// External chat service over HTTP
    Http,
}

impl ResponderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "canned" => Some(Self::Canned),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

/// Responder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderConfig {
    pub kind: ResponderKind,
    /// Endpoint for [`ResponderKind::Http`]
    pub url: Option<String>,
    /// Simulated latency for [`ResponderKind::Canned`]
    pub latency: Duration,
    /// Upper bound on any single reply
    pub timeout: Duration,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            kind: ResponderKind::Canned,
            url: None,
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub responder: ResponderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            responder: ResponderConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = parse_var("UNI360_PORT", lookup("UNI360_PORT")).unwrap_or(defaults.port);

        let kind = match lookup("UNI360_RESPONDER") {
            Some(raw) => ResponderKind::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown UNI360_RESPONDER, using canned replies");
                ResponderKind::Canned
            }),
            None => defaults.responder.kind,
        };

        let url = lookup("UNI360_RESPONDER_URL")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let latency = parse_var("UNI360_RESPONSE_LATENCY_MS", lookup("UNI360_RESPONSE_LATENCY_MS"))
            .map_or(defaults.responder.latency, Duration::from_millis);

        let timeout = parse_var("UNI360_RESPONSE_TIMEOUT_MS", lookup("UNI360_RESPONSE_TIMEOUT_MS"))
            .filter(|ms: &u64| {
                if *ms == 0 {
                    tracing::warn!("UNI360_RESPONSE_TIMEOUT_MS must be positive, using default");
                }
                *ms > 0
            })
            .map_or(defaults.responder.timeout, Duration::from_millis);

        Self {
            port,
            responder: ResponderConfig {
                kind,
                url,
                latency,
                timeout,
            },
        }
    }
}

/// Parse a set variable, warning when the value is unusable
fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(variable = key, value = %raw, "Unparseable value, using default");
    }
    parsed
}

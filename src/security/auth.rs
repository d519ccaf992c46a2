//! Token authorization
//!
//! API requests carry the shared token either as `X-Token: <token>` or as
//! `Authorization: Bearer <token>`. With no token configured every request
//! is authorized.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::info;

/// Custom header carrying the token
pub const TOKEN_HEADER: &str = "x-token";

const BEARER_PREFIX: &str = "Bearer ";

/// Checks request headers against the configured token
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    token: Option<String>,
}

impl TokenAuthenticator {
    /// Create new authenticator; `None` or an empty token disables auth
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.is_empty());

        info!(
            "Initializing authenticator: {}",
            if token.is_some() { "token" } else { "none" }
        );

        Self { token }
    }

    /// Whether a token is required
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check whether `headers` carry the configured token
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return true;
        };

        let from_custom = headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| tokens_match(expected, v));

        let from_bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .is_some_and(|v| tokens_match(expected, v));

        from_custom || from_bearer
    }

    /// Short form of the token for log output
    ///
    /// First four characters followed by an ellipsis, or `disabled`.
    pub fn redacted(&self) -> String {
        match self.token.as_deref() {
            Some(token) => {
                let visible: String = token.chars().take(4).collect();
                format!("{}…", visible)
            }
            None => "disabled".to_string(),
        }
    }
}

fn tokens_match(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::token_service::TokenResponse;

pub type AccessToken = String;
pub type RefreshToken = String;

/// Fraction of the server-declared lifetime after which a token is treated
/// as expired, so refresh happens before the server-side token actually dies.
pub const DEFAULT_LIFETIME_FRACTION: f64 = 0.9;

/// Bearer token pair with its proactive-refresh deadline.
///
/// A `Token` is immutable once built; the session replaces it wholesale on
/// every refresh or re-acquisition so `expires_at` can never drift from the
/// stored credential.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Token {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Builds a token from a token-endpoint response, computing the refresh
    /// deadline as `now + lifetime_fraction * expires_in`.
    pub fn from_response(response: TokenResponse, lifetime_fraction: f64) -> Self {
        let lifetime_ms = (lifetime_fraction * response.expires_in as f64 * 1000.0).round() as i64;
        let expires_at = Utc::now() + TimeDelta::milliseconds(lifetime_ms);

        Token {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.lt(&Utc::now())
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bearer {}", self.access_token)
    }
}

use std::time::Duration;

use url::Url;

use crate::token::DEFAULT_LIFETIME_FRACTION;
use crate::token_service::{GrantRequest, TokenResponse};

pub const DEFAULT_REALM: &str = "master";
pub const DEFAULT_CLIENT_ID: &str = "admin-cli";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("server url must not be empty")]
    MissingServerUrl,
    #[error("invalid server url `{0}`: `{1}`")]
    InvalidServerUrl(String, String),
    #[error("token lifetime fraction `{0}` must be within (0, 1]")]
    InvalidLifetimeFraction(f64),
}

/// Construction-time configuration for a [`CredentialSession`].
///
/// Only the server URL is required; everything else defaults to the values
/// the identity provider's admin client conventionally uses.
///
/// [`CredentialSession`]: crate::session::CredentialSession
#[derive(Debug, Clone)]
pub struct SessionConfig {
    server_url: String,
    username: Option<String>,
    password: Option<String>,
    token: Option<TokenResponse>,
    totp: Option<String>,
    realm_name: String,
    client_id: String,
    tls_verify: bool,
    client_secret_key: Option<String>,
    custom_headers: Vec<(String, String)>,
    user_realm_name: Option<String>,
    timeout: Duration,
    token_lifetime_fraction: f64,
}

impl SessionConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            username: None,
            password: None,
            token: None,
            totp: None,
            realm_name: DEFAULT_REALM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            tls_verify: true,
            client_secret_key: None,
            custom_headers: Vec::new(),
            user_realm_name: None,
            timeout: DEFAULT_TIMEOUT,
            token_lifetime_fraction: DEFAULT_LIFETIME_FRACTION,
        }
    }

    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..self
        }
    }

    /// Pre-supplied token pair; skips the initial grant at construction.
    pub fn with_token(self, token: TokenResponse) -> Self {
        Self {
            token: Some(token),
            ..self
        }
    }

    pub fn with_totp(self, totp: impl Into<String>) -> Self {
        Self {
            totp: Some(totp.into()),
            ..self
        }
    }

    pub fn with_realm(self, realm_name: impl Into<String>) -> Self {
        Self {
            realm_name: realm_name.into(),
            ..self
        }
    }

    pub fn with_client_id(self, client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..self
        }
    }

    pub fn with_client_secret(self, client_secret_key: impl Into<String>) -> Self {
        Self {
            client_secret_key: Some(client_secret_key.into()),
            ..self
        }
    }

    /// Realm the user belongs to, when distinct from the realm being managed.
    pub fn with_user_realm(self, user_realm_name: impl Into<String>) -> Self {
        Self {
            user_realm_name: Some(user_realm_name.into()),
            ..self
        }
    }

    pub fn with_tls_verify(self, tls_verify: bool) -> Self {
        Self { tls_verify, ..self }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_custom_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.custom_headers.push((key.into(), value.into()));
        self
    }

    pub fn with_token_lifetime_fraction(self, token_lifetime_fraction: f64) -> Self {
        Self {
            token_lifetime_fraction,
            ..self
        }
    }

    /// Fails fast on a missing or unparseable server URL and on an
    /// out-of-range lifetime fraction. The returned URL always carries a
    /// trailing slash so relative paths join under it.
    pub(crate) fn validate(&self) -> Result<Url, ConfigError> {
        if self.server_url.is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }
        if !(self.token_lifetime_fraction > 0.0 && self.token_lifetime_fraction <= 1.0) {
            return Err(ConfigError::InvalidLifetimeFraction(
                self.token_lifetime_fraction,
            ));
        }

        let normalized = if self.server_url.ends_with('/') {
            self.server_url.clone()
        } else {
            format!("{}/", self.server_url)
        };
        Url::parse(&normalized)
            .map_err(|e| ConfigError::InvalidServerUrl(self.server_url.clone(), e.to_string()))
    }

    /// Grant used for token acquisition, if any: a configured client secret
    /// selects `client_credentials`, otherwise username and password select
    /// `password`. With neither, the session runs unauthenticated.
    pub(crate) fn grant(&self) -> Option<GrantRequest> {
        if self.client_secret_key.is_some() {
            return Some(GrantRequest::ClientCredentials);
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(GrantRequest::Password {
                username: username.clone(),
                password: password.clone(),
                totp: self.totp.clone(),
            }),
            _ => None,
        }
    }

    /// Realm the token endpoint is resolved against.
    pub(crate) fn token_realm(&self) -> &str {
        self.user_realm_name.as_deref().unwrap_or(&self.realm_name)
    }

    pub(crate) fn pre_supplied_token(&self) -> Option<TokenResponse> {
        self.token.clone()
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> Option<String> {
        self.client_secret_key.clone()
    }

    pub(crate) fn custom_headers(&self) -> &[(String, String)] {
        &self.custom_headers
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    pub(crate) fn token_lifetime_fraction(&self) -> f64 {
        self.token_lifetime_fraction
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod openid;

#[derive(Error, Debug)]
pub enum TokenRequestError {
    /// Token endpoint answered with a non-2xx status. Carries the status code
    /// and the raw response body for diagnostics.
    #[error("token endpoint error: status code `{0}`, body `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
    #[error("unable to deserialize token response: `{0}`")]
    DeserializeError(String),
}

/// Inputs needed to acquire a token from scratch.
///
/// The grant carries only the caller-side credentials; client id, client
/// secret and realm are fixed per token service instance.
#[derive(Debug, Clone, PartialEq)]
pub enum GrantRequest {
    Password {
        username: String,
        password: String,
        totp: Option<String>,
    },
    ClientCredentials,
}

impl GrantRequest {
    /// OAuth2 `grant_type` value for the wire encoding.
    pub fn grant_type(&self) -> &'static str {
        match self {
            GrantRequest::Password { .. } => "password",
            GrantRequest::ClientCredentials => "client_credentials",
        }
    }
}

/// Successful token-endpoint response, for both acquisition and refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The lifetime in seconds of the access token.
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// The TokenService is responsible for obtaining bearer tokens from the
/// OpenID Connect token endpoint.
pub trait TokenService {
    /// Acquires a fresh token pair using the given grant.
    fn acquire(&self, grant: &GrantRequest) -> Result<TokenResponse, TokenRequestError>;

    /// Exchanges a refresh token for a new token pair.
    fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenRequestError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use mockall::mock;

    mock! {
        pub TokenService {}

        impl TokenService for TokenService {
            fn acquire(&self, grant: &GrantRequest) -> Result<TokenResponse, TokenRequestError>;
            fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenRequestError>;
        }
    }

    #[test]
    fn grant_type_encoding() {
        let password = GrantRequest::Password {
            username: "user".into(),
            password: "pass".into(),
            totp: None,
        };
        assert_eq!(password.grant_type(), "password");
        assert_eq!(GrantRequest::ClientCredentials.grant_type(), "client_credentials");
    }

    #[test]
    fn token_response_deserializes_without_optional_fields() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","expires_in":60}"#).unwrap();

        assert_eq!(response.access_token, "abc");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 60);
        assert_eq!(response.token_type, None);
    }

    #[test]
    fn token_response_ignores_extra_fields() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","refresh_token":"def","expires_in":60,"token_type":"Bearer","session_state":"xyz","scope":"profile"}"#,
        )
        .unwrap();

        assert_eq!(response.refresh_token, Some("def".to_string()));
        assert_eq!(response.token_type, Some("Bearer".to_string()));
    }
}

//! Authenticated HTTP client layer that manages OpenID Connect bearer
//! tokens transparently across a long-lived blocking session.
//!
//! [`CredentialSession`] wraps a [`Transport`] (connection pool, default
//! headers, timeout and TLS policy, bounded connection-level retry) and
//! keeps the `Authorization` header valid by refreshing or re-acquiring the
//! token before each request. Token acquisition goes through the
//! [`TokenService`] trait; [`OpenIdTokenService`] is the HTTP implementation
//! against a standard OpenID Connect token endpoint.
//!
//! ```no_run
//! use oidc_session::{CredentialSession, SessionConfig};
//!
//! # fn main() -> Result<(), oidc_session::SessionError> {
//! let config = SessionConfig::new("https://idp.example.com/auth")
//!     .with_credentials("admin", "admin");
//! let mut session = CredentialSession::new(config)?;
//!
//! let response = session.get("admin/realms", &[])?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod http_client;
pub mod session;
pub mod token;
pub mod token_service;
pub mod transport;

pub use config::{ConfigError, SessionConfig};
pub use crate::http::client::ReqwestClient;
pub use crate::http::config::HttpConfig;
pub use http_client::{HttpClient, HttpClientError};
pub use session::{CredentialSession, SessionError};
pub use token::Token;
pub use token_service::openid::OpenIdTokenService;
pub use token_service::{GrantRequest, TokenRequestError, TokenResponse, TokenService};
pub use transport::{Transport, TransportError};

use http::Response;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, SessionConfig};
use crate::http::client::{HttpBuildError, ReqwestClient};
use crate::http::config::HttpConfig;
use crate::http_client::HttpClient;
use crate::token::Token;
use crate::token_service::openid::OpenIdTokenService;
use crate::token_service::{GrantRequest, TokenRequestError, TokenResponse, TokenService};
use crate::transport::{Transport, TransportError};

/// Server-side phrasings that mean the refresh token is categorically dead
/// and a full re-acquisition is the only way forward.
const REFRESH_REJECTIONS: [&str; 3] =
    ["Refresh token expired", "Token is not active", "Session not active"];

/// Whether a failed refresh should fall back to full re-acquisition instead
/// of surfacing the error. Matches the known rejection phrasings on a 400;
/// anything else is treated as an unexpected failure.
///
/// Kept as a single predicate so the matching strategy can be hardened
/// without touching the refresh state machine.
fn is_refresh_rejected(status: u16, body: &str) -> bool {
    status == 400 && REFRESH_REJECTIONS.iter().any(|phrase| body.contains(phrase))
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid session configuration: `{0}`")]
    Config(#[from] ConfigError),
    #[error("could not build the http client: `{0}`")]
    HttpBuild(#[from] HttpBuildError),
    #[error("sending request: `{0}`")]
    Transport(#[from] TransportError),
    #[error("requesting token: `{0}`")]
    TokenRequest(#[from] TokenRequestError),
}

/// HTTP session that keeps its bearer token valid across calls.
///
/// Every verb call first checks the stored token against its refresh
/// deadline and refreshes or re-acquires it before the request goes out, so
/// callers never see an expired `Authorization` header. A session built
/// without any grant context runs unauthenticated: requests proceed with no
/// `Authorization` header and it is up to the caller to watch for 401/403.
///
/// Verb calls take `&mut self`; sharing a session across threads requires
/// external synchronization, which also keeps refreshes one-at-a-time.
pub struct CredentialSession<C = ReqwestClient, T = OpenIdTokenService<ReqwestClient>> {
    transport: Transport<C>,
    token_service: T,
    token: Option<Token>,
    grant: Option<GrantRequest>,
    lifetime_fraction: f64,
}

impl<C, T> std::fmt::Debug for CredentialSession<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSession").finish_non_exhaustive()
    }
}

impl CredentialSession {
    /// Builds the session and, unless a token was pre-supplied or no grant
    /// context is configured, acquires the initial token.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let server_url = config.validate()?;
        let http_config = HttpConfig::new(config.timeout(), config.tls_verify());

        let mut transport = Transport::new(server_url.clone(), http_config.clone())?;
        transport.add_header(CONTENT_TYPE.as_str(), "application/json");
        for (key, value) in config.custom_headers() {
            transport.add_header(key.clone(), value.clone());
        }

        let token_service = OpenIdTokenService::for_realm(
            ReqwestClient::new(http_config)?,
            &server_url,
            config.token_realm(),
            config.client_id(),
            config.client_secret(),
        )
        .map_err(|e| {
            ConfigError::InvalidServerUrl(server_url.to_string(), e.to_string())
        })?;

        Self::with_parts(
            transport,
            token_service,
            config.grant(),
            config.pre_supplied_token(),
            config.token_lifetime_fraction(),
        )
    }
}

impl<C, T> CredentialSession<C, T>
where
    C: HttpClient,
    T: TokenService,
{
    /// Assembles a session from an existing transport and token service.
    /// Acquires the initial token right away when a grant is configured and
    /// no token was pre-supplied.
    pub fn with_parts(
        transport: Transport<C>,
        token_service: T,
        grant: Option<GrantRequest>,
        initial_token: Option<TokenResponse>,
        lifetime_fraction: f64,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            transport,
            token_service,
            token: None,
            grant,
            lifetime_fraction,
        };

        match initial_token {
            Some(response) => session.replace_token(Some(response)),
            None if session.grant.is_some() => session.acquire_token()?,
            None => {}
        }

        Ok(session)
    }

    /// Whether the session currently holds a credential. A `false` here
    /// means requests go out without an `Authorization` header.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<C> {
        &mut self.transport
    }

    /// Refreshes the token pair, falling back to full re-acquisition when
    /// the server rejects the refresh token as dead. Any other refresh
    /// failure propagates unchanged.
    pub fn refresh_token(&mut self) -> Result<(), SessionError> {
        let refresh_token = self
            .token
            .as_ref()
            .and_then(|t| t.refresh_token().cloned());

        match refresh_token {
            None => self.acquire_token()?,
            Some(refresh_token) => match self.token_service.refresh(&refresh_token) {
                Ok(response) => {
                    debug!("authorization token refreshed");
                    self.replace_token(Some(response));
                }
                Err(TokenRequestError::HttpResponseError(status, body))
                    if is_refresh_rejected(status, &body) =>
                {
                    warn!("refresh token rejected by the server, acquiring a new token");
                    self.acquire_token()?;
                }
                Err(e) => return Err(e.into()),
            },
        }

        Ok(())
    }

    /// Acquires a token from scratch using the configured grant. With no
    /// grant context the credential is cleared and the session degrades to
    /// unauthenticated requests.
    fn acquire_token(&mut self) -> Result<(), SessionError> {
        match &self.grant {
            Some(grant) => {
                debug!(grant = grant.grant_type(), "acquiring authorization token");
                let response = self.token_service.acquire(grant)?;
                self.replace_token(Some(response));
            }
            None => self.replace_token(None),
        }
        Ok(())
    }

    /// Replaces the stored credential wholesale: the refresh deadline and
    /// the `Authorization` header are updated in the same step.
    fn replace_token(&mut self, response: Option<TokenResponse>) {
        match response {
            Some(response) => {
                let token = Token::from_response(response, self.lifetime_fraction);
                self.transport.add_header(AUTHORIZATION.as_str(), token.to_string());
                self.token = Some(token);
            }
            None => {
                self.transport.remove_header(AUTHORIZATION.as_str());
                self.token = None;
            }
        }
    }

    fn refresh_if_required(&mut self) -> Result<(), SessionError> {
        let expired = self.token.as_ref().is_none_or(Token::is_expired);
        if expired {
            self.refresh_token()?;
        }
        Ok(())
    }

    pub fn get(
        &mut self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, SessionError> {
        self.refresh_if_required()?;
        Ok(self.transport.get(path, query)?)
    }

    pub fn post(
        &mut self,
        path: &str,
        body: Vec<u8>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, SessionError> {
        self.refresh_if_required()?;
        Ok(self.transport.post(path, body, query)?)
    }

    pub fn put(
        &mut self,
        path: &str,
        body: Vec<u8>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, SessionError> {
        self.refresh_if_required()?;
        Ok(self.transport.put(path, body, query)?)
    }

    pub fn delete(
        &mut self,
        path: &str,
        body: Option<Vec<u8>>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, SessionError> {
        self.refresh_if_required()?;
        Ok(self.transport.delete(path, body, query)?)
    }
}

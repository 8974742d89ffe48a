use http::{Request, header};
use url::{Url, form_urlencoded};

use crate::http_client::HttpClient;
use crate::token_service::{GrantRequest, TokenRequestError, TokenResponse, TokenService};

/// OpenID Connect token-endpoint client.
///
/// Posts form-encoded grant requests to
/// `realms/{realm}/protocol/openid-connect/token` under the server URL.
pub struct OpenIdTokenService<C> {
    http_client: C,
    token_url: Url,
    client_id: String,
    client_secret: Option<String>,
}

impl<C> OpenIdTokenService<C> {
    pub fn new(
        http_client: C,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http_client,
            token_url,
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Builds the service against the conventional token endpoint of `realm`
    /// under `server_url`.
    pub fn for_realm(
        http_client: C,
        server_url: &Url,
        realm: &str,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Result<Self, url::ParseError> {
        let token_url =
            server_url.join(&format!("realms/{realm}/protocol/openid-connect/token"))?;
        Ok(Self::new(http_client, token_url, client_id, client_secret))
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    fn client_form(&self) -> form_urlencoded::Serializer<'static, String> {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("client_id", &self.client_id);
        if let Some(secret) = &self.client_secret {
            form.append_pair("client_secret", secret);
        }
        form
    }

    fn acquire_body(&self, grant: &GrantRequest) -> String {
        let mut form = self.client_form();
        form.append_pair("grant_type", grant.grant_type());
        if let GrantRequest::Password {
            username,
            password,
            totp,
        } = grant
        {
            form.append_pair("username", username);
            form.append_pair("password", password);
            if let Some(totp) = totp {
                form.append_pair("totp", totp);
            }
        }
        form.finish()
    }

    fn refresh_body(&self, refresh_token: &str) -> String {
        let mut form = self.client_form();
        form.append_pair("grant_type", "refresh_token");
        form.append_pair("refresh_token", refresh_token);
        form.finish()
    }
}

impl<C> OpenIdTokenService<C>
where
    C: HttpClient,
{
    fn post_form(&self, body: String) -> Result<TokenResponse, TokenRequestError> {
        let request = Request::builder()
            .method(http::Method::POST)
            .uri(self.token_url.as_str())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.into_bytes())
            .map_err(|e| TokenRequestError::HttpTransportError(e.to_string()))?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| TokenRequestError::HttpTransportError(e.to_string()))?;

        let body: String = String::from_utf8(response.body().clone()).map_err(|e| {
            TokenRequestError::DeserializeError(format!("invalid utf8 response: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(TokenRequestError::HttpResponseError(
                response.status().as_u16(),
                body,
            ));
        }

        serde_json::from_str(body.as_str())
            .map_err(|e| TokenRequestError::DeserializeError(e.to_string()))
    }
}

impl<C> TokenService for OpenIdTokenService<C>
where
    C: HttpClient,
{
    fn acquire(&self, grant: &GrantRequest) -> Result<TokenResponse, TokenRequestError> {
        self.post_form(self.acquire_body(grant))
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenRequestError> {
        self.post_form(self.refresh_body(refresh_token))
    }
}

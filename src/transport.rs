use std::collections::HashMap;

use http::{HeaderName, HeaderValue, Method, Request, Response};
use url::Url;

use crate::http::client::{HttpBuildError, ReqwestClient};
use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient, HttpClientError};

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("invalid request url `{0}`: `{1}`")]
    InvalidUrl(String, String),
    #[error("invalid request header `{0}`")]
    InvalidHeader(String),
    /// Connection-level failure. Surfaced explicitly so a request that never
    /// reached the server is distinguishable from any server response.
    #[error(transparent)]
    Send(#[from] HttpClientError),
}

/// HTTP transport over a long-lived connection pool.
///
/// Holds the base URL, the default header map and the client carrying the
/// timeout, TLS and retry policy. Knows nothing about tokens; the header map
/// is plain key/value state merged into every request.
pub struct Transport<C = ReqwestClient> {
    base_url: Url,
    headers: HashMap<String, String>,
    http_client: C,
}

impl Transport<ReqwestClient> {
    pub fn new(base_url: Url, config: HttpConfig) -> Result<Self, HttpBuildError> {
        let http_client = ReqwestClient::new(config)?;
        Ok(Self::with_client(base_url, http_client))
    }
}

impl<C> Transport<C> {
    pub fn with_client(base_url: Url, http_client: C) -> Self {
        Self {
            base_url,
            headers: HashMap::new(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Adds or replaces a header. Keys are unique, last write wins.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// Removes a header. Removing an absent key is a no-op.
    pub fn remove_header(&mut self, key: &str) {
        self.headers.remove(key);
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    fn request_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(path.to_string(), e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        query: &[(&str, &str)],
    ) -> Result<Request<Vec<u8>>, TransportError> {
        let url = self.request_url(path, query)?;
        let mut builder = Request::builder().method(method).uri(url.as_str());

        for (key, value) in &self.headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|_| TransportError::InvalidHeader(key.clone()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|_| TransportError::InvalidHeader(key.clone()))?;
            builder = builder.header(name, value);
        }

        builder
            .body(body)
            .map_err(|e| TransportError::InvalidUrl(path.to_string(), e.to_string()))
    }
}

impl<C> Transport<C>
where
    C: HttpClient,
{
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, TransportError> {
        let request = self.build_request(method, path, body, query)?;
        Ok(self.http_client.send(request)?)
    }

    pub fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, TransportError> {
        self.send(Method::GET, path, Vec::new(), query)
    }

    pub fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, TransportError> {
        self.send(Method::POST, path, body, query)
    }

    pub fn put(
        &self,
        path: &str,
        body: Vec<u8>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, TransportError> {
        self.send(Method::PUT, path, body, query)
    }

    pub fn delete(
        &self,
        path: &str,
        body: Option<Vec<u8>>,
        query: &[(&str, &str)],
    ) -> Result<Response<Vec<u8>>, TransportError> {
        self.send(Method::DELETE, path, body.unwrap_or_default(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use assert_matches::assert_matches;

    use crate::http_client::tests::{MockHttpClient, RecordingClient};

    type Recorded = Rc<RefCell<Vec<Request<Vec<u8>>>>>;

    fn recording_transport(base: &str) -> (Transport<RecordingClient>, Recorded) {
        let requests: Recorded = Rc::new(RefCell::new(Vec::new()));
        let client = RecordingClient::ok(Rc::clone(&requests));
        let transport = Transport::with_client(Url::parse(base).unwrap(), client);
        (transport, requests)
    }

    #[test]
    fn header_last_write_wins() {
        let (mut transport, _) = recording_transport("https://api.example.com/");

        transport.add_header("Authorization", "Bearer one");
        transport.add_header("Authorization", "Bearer two");

        assert_eq!(transport.header("Authorization"), Some("Bearer two"));
    }

    #[test]
    fn remove_absent_header_is_noop() {
        let (mut transport, _) = recording_transport("https://api.example.com/");

        transport.remove_header("X-Not-There");

        assert!(!transport.has_header("X-Not-There"));
    }

    #[test]
    fn clear_headers_empties_the_map() {
        let (mut transport, _) = recording_transport("https://api.example.com/");

        transport.add_header("X-One", "1");
        transport.add_header("X-Two", "2");
        transport.clear_headers();

        assert!(!transport.has_header("X-One"));
        assert!(!transport.has_header("X-Two"));
    }

    #[test]
    fn relative_path_appends_to_base_path() {
        let (transport, requests) = recording_transport("https://api.example.com/auth/");

        transport.get("admin/realms", &[]).unwrap();

        let recorded = requests.borrow();
        assert_eq!(
            recorded[0].uri().to_string(),
            "https://api.example.com/auth/admin/realms"
        );
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let (transport, requests) = recording_transport("https://api.example.com/auth/");

        transport.get("/health", &[]).unwrap();

        let recorded = requests.borrow();
        assert_eq!(recorded[0].uri().to_string(), "https://api.example.com/health");
    }

    #[test]
    fn query_params_are_appended() {
        let (transport, requests) = recording_transport("https://api.example.com/");

        transport
            .get("users", &[("first", "0"), ("max", "10")])
            .unwrap();

        let recorded = requests.borrow();
        assert_eq!(
            recorded[0].uri().to_string(),
            "https://api.example.com/users?first=0&max=10"
        );
    }

    #[test]
    fn headers_are_merged_into_the_request() {
        let (mut transport, requests) = recording_transport("https://api.example.com/");
        transport.add_header("Authorization", "Bearer abc");
        transport.add_header("Content-Type", "application/json");

        transport.post("users", b"{}".to_vec(), &[]).unwrap();

        let recorded = requests.borrow();
        assert_eq!(recorded[0].headers()["authorization"], "Bearer abc");
        assert_eq!(recorded[0].headers()["content-type"], "application/json");
        assert_eq!(recorded[0].body(), b"{}");
    }

    #[test]
    fn delete_defaults_to_empty_body() {
        let (transport, requests) = recording_transport("https://api.example.com/");

        transport.delete("users/1", None, &[]).unwrap();

        let recorded = requests.borrow();
        assert_eq!(recorded[0].method(), Method::DELETE);
        assert!(recorded[0].body().is_empty());
    }

    #[test]
    fn error_status_is_returned_as_a_response() {
        let requests: Recorded = Rc::new(RefCell::new(Vec::new()));
        let client = RecordingClient::with_status(Rc::clone(&requests), 404);
        let transport = Transport::with_client(Url::parse("https://api.example.com/").unwrap(), client);

        let response = transport.get("missing", &[]).unwrap();

        assert_eq!(response.status().as_u16(), 404);
    }

    #[test]
    fn connection_failure_surfaces_as_send_error() {
        let mut client = MockHttpClient::new();
        client
            .expect_send()
            .once()
            .returning(|_| Err(HttpClientError::TransportError("connection refused".into())));
        let transport = Transport::with_client(Url::parse("https://api.example.com/").unwrap(), client);

        let error = transport.get("users", &[]).unwrap_err();

        assert_matches!(error, TransportError::Send(HttpClientError::TransportError(_)));
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let (mut transport, _) = recording_transport("https://api.example.com/");
        transport.add_header("X-Bad", "line\nbreak");

        let error = transport.get("users", &[]).unwrap_err();

        assert_matches!(error, TransportError::InvalidHeader(key) => assert_eq!(key, "X-Bad"));
    }
}

use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient, HttpClientError};
use http::{Request, Response};
use reqwest::blocking::{Client, Response as BlockingResponse};
use tracing::debug;

/// Blocking HTTP client backed by a persistent reqwest connection pool.
///
/// A send that fails at the connection level (refused, reset, timed out) is
/// retried a bounded number of times for the methods allowed by the
/// [`HttpConfig`]. HTTP-level responses are never retried here, whatever
/// their status.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    config: HttpConfig,
}

impl ReqwestClient {
    pub fn new(config: HttpConfig) -> Result<Self, HttpBuildError> {
        let builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true)
            .danger_accept_invalid_certs(!config.tls_verify)
            .timeout(config.timeout)
            .connect_timeout(config.timeout);

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn send_once(&self, request: &Request<Vec<u8>>) -> Result<BlockingResponse, reqwest::Error> {
        self.client
            .request(request.method().into(), request.uri().to_string().as_str())
            .headers(request.headers().clone())
            .body(request.body().to_vec())
            .send()
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        let mut attempt: u8 = 0;
        loop {
            match self.send_once(&request) {
                Ok(res) => return try_build_response(res),
                Err(err) => {
                    if attempt < self.config.retries && self.config.is_retryable(request.method())
                    {
                        attempt += 1;
                        debug!(
                            method = %request.method(),
                            attempt,
                            "connection-level failure, retrying: {err}"
                        );
                        continue;
                    }
                    return Err(HttpClientError::TransportError(err.to_string()));
                }
            }
        }
    }
}

fn try_build_response(res: BlockingResponse) -> Result<Response<Vec<u8>>, HttpClientError> {
    let status = res.status();
    let version = res.version();

    let body: Vec<u8> = res
        .bytes()
        .map_err(|err| HttpClientError::InvalidResponse(err.to_string()))?
        .into();

    Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpClientError::InvalidResponse(err.to_string()))
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use http::Method;
    use httpmock::{Method::GET, MockServer};

    fn test_config() -> HttpConfig {
        HttpConfig::new(Duration::from_secs(2), true)
    }

    /// Accepts connections, reads a little, then drops each one without
    /// answering. Returns the address and the accept counter.
    fn broken_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 256];
                let _ = stream.read(&mut buf);
                drop(stream);
            }
        });
        (addr, accepted)
    }

    fn request(method: Method, uri: &str) -> Request<Vec<u8>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    #[test]
    fn post_connection_failure_is_retried_once() {
        let (addr, accepted) = broken_server();
        let client = ReqwestClient::new(test_config()).unwrap();

        let result = client.send(request(Method::POST, &addr));

        assert_matches!(result, Err(HttpClientError::TransportError(_)));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn connection_failure_is_not_retried_with_zero_retries() {
        let (addr, accepted) = broken_server();
        let client = ReqwestClient::new(test_config().with_retries(0)).unwrap();

        let result = client.send(request(Method::GET, &addr));

        assert_matches!(result, Err(HttpClientError::TransportError(_)));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_retryable_method_fails_on_first_attempt() {
        let (addr, accepted) = broken_server();
        let config = test_config().with_retry_methods(vec![Method::GET]);
        let client = ReqwestClient::new(config).unwrap();

        let result = client.send(request(Method::POST, &addr));

        assert_matches!(result, Err(HttpClientError::TransportError(_)));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn http_error_status_is_returned_and_never_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        });

        let client = ReqwestClient::new(test_config()).unwrap();
        let response = client
            .send(request(Method::GET, &server.url("/missing")))
            .unwrap();

        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(response.body(), b"not found");
        mock.assert();
    }

    #[test]
    fn connection_refused_surfaces_transport_error() {
        // Bind then drop the listener so the port is closed.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = ReqwestClient::new(test_config().with_retries(0)).unwrap();
        let result = client.send(request(Method::GET, &addr));

        assert_matches!(result, Err(HttpClientError::TransportError(_)));
    }
}

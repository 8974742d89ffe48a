use http::{Request, Response};

#[derive(thiserror::Error, Debug)]
pub enum HttpClientError {
    /// Represents a connection-level failure (DNS, TCP, TLS, timeout).
    #[error("http transport error: `{0}`")]
    TransportError(String),
    /// Represents an unexpected or unreadable response.
    #[error("invalid http response: `{0}`")]
    InvalidResponse(String),
}

/// A synchronous trait that defines the internal methods for HTTP clients.
///
/// A non-2xx status is not an error at this level: any response the server
/// produced is returned as `Ok`.
pub trait HttpClient {
    /// A synchronous function sends a request. The method and url are defined inside the Request.
    fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError>;
}

// Accept closures as HttpClient implementations
impl<F> HttpClient for F
where
    F: Fn(Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError>,
{
    fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        self(req)
    }
}

use std::time::Duration;

use http::Method;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection-level retries performed on top of a failed send.
pub const DEFAULT_RETRIES: u8 = 1;

/// Methods eligible for connection-level retry.
///
/// The conventional idempotent set, deliberately extended with POST: the
/// token and admin endpoints this client targets tolerate a re-sent POST.
const DEFAULT_RETRY_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::PUT,
    Method::DELETE,
    Method::POST,
];

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub(crate) timeout: Duration,
    pub(crate) tls_verify: bool,
    pub(crate) retries: u8,
    pub(crate) retry_methods: Vec<Method>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            tls_verify: true,
            retries: DEFAULT_RETRIES,
            retry_methods: DEFAULT_RETRY_METHODS.to_vec(),
        }
    }
}

impl HttpConfig {
    pub fn new(timeout: Duration, tls_verify: bool) -> Self {
        Self {
            timeout,
            tls_verify,
            ..Self::default()
        }
    }

    pub fn with_retries(self, retries: u8) -> Self {
        Self { retries, ..self }
    }

    pub fn with_retry_methods(self, retry_methods: Vec<Method>) -> Self {
        Self {
            retry_methods,
            ..self
        }
    }

    pub(crate) fn is_retryable(&self, method: &Method) -> bool {
        self.retry_methods.contains(method)
    }
}

use std::fmt;
use std::time::Duration;

use hermes_core::error::{AppError, TransportError};
use hermes_core::traits::{ApiRequest, ApiResponse, Method, Transport};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

/// Per-request timeout when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("hermes/", env!("CARGO_PKG_VERSION"));

/// Static API credentials, sent as HTTP basic auth on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP transport using reqwest.
///
/// Sends one request per call with basic auth attached, reads the whole
/// body and reports non-2xx responses as ordinary responses.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    credentials: Credentials,
    /// Unknown when the client was supplied by the caller.
    timeout_secs: Option<u64>,
}

impl ReqwestTransport {
    pub fn new(credentials: Credentials) -> Result<Self, AppError> {
        Self::with_timeout(credentials, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            timeout_secs: Some(timeout.as_secs()),
        })
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, ...).
    pub fn with_client(client: Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            timeout_secs: None,
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let mut builder =
            builder.basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout_secs))?;

        tracing::trace!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "Response received"
        );

        Ok(ApiResponse {
            status_code: status.as_u16(),
            status: status.to_string(),
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout_secs: Option<u64>) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(timeout_message(timeout_secs, &e))
    } else if e.is_connect() {
        TransportError::new(format!("Connection failed: {e}"))
    } else {
        TransportError::new(e.to_string())
    }
}

fn timeout_message(timeout_secs: Option<u64>, e: &dyn fmt::Display) -> String {
    match timeout_secs {
        Some(secs) => format!("Request timed out after {secs} seconds: {e}"),
        None => format!("Request timed out: {e}"),
    }
}

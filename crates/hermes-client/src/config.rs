use std::time::Duration;

use hermes_core::client::{DEFAULT_BASE_URL, Endpoints, JobClient};
use hermes_core::error::AppError;
use url::Url;

use crate::transport::{Credentials, DEFAULT_REQUEST_TIMEOUT, ReqwestTransport};

/// Connection settings for the scraping API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            endpoints: Endpoints::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `HERMES_USERNAME`, `HERMES_PASSWORD` (required)
    /// - `HERMES_BASE_URL` (optional, defaults to the public API)
    /// - `HERMES_REQUEST_TIMEOUT_SECS` (optional, defaults to 30)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup("HERMES_USERNAME").filter(|v| !v.is_empty()).ok_or_else(|| {
            AppError::Config("HERMES_USERNAME not set. Required for API access.".into())
        })?;
        let password = lookup("HERMES_PASSWORD").filter(|v| !v.is_empty()).ok_or_else(|| {
            AppError::Config("HERMES_PASSWORD not set. Required for API access.".into())
        })?;

        let base_url = match lookup("HERMES_BASE_URL") {
            Some(raw) if !raw.is_empty() => validate_base_url(&raw)?,
            _ => DEFAULT_BASE_URL.to_string(),
        };

        let request_timeout = match lookup("HERMES_REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    AppError::Config(format!(
                        "Invalid HERMES_REQUEST_TIMEOUT_SECS '{raw}': must be a positive integer"
                    ))
                })?;
                if secs == 0 {
                    return Err(AppError::Config(
                        "HERMES_REQUEST_TIMEOUT_SECS must be at least 1".into(),
                    ));
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self {
            credentials: Credentials::new(username, password),
            endpoints: Endpoints::new(&base_url),
            request_timeout,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build a job client backed by [`ReqwestTransport`].
    pub fn build(&self) -> Result<JobClient<ReqwestTransport>, AppError> {
        for url in [
            &self.endpoints.submit_url,
            &self.endpoints.status_url,
            &self.endpoints.results_url,
        ] {
            validate_base_url(url)?;
        }

        let transport =
            ReqwestTransport::with_timeout(self.credentials.clone(), self.request_timeout)?;
        tracing::debug!(
            submit_url = %self.endpoints.submit_url,
            timeout = ?self.request_timeout,
            "Job client configured"
        );
        Ok(JobClient::new(transport, self.endpoints.clone()))
    }
}

/// Accept only absolute http(s) URLs.
fn validate_base_url(raw: &str) -> Result<String, AppError> {
    let parsed =
        Url::parse(raw).map_err(|e| AppError::Config(format!("Invalid base URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        scheme => Err(AppError::Config(format!(
            "URL scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_required_and_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HERMES_USERNAME", "user"),
            ("HERMES_PASSWORD", "pass"),
        ]))
        .unwrap();

        assert_eq!(config.credentials, Credentials::new("user", "pass"));
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_credentials_fail() {
        let err = ClientConfig::from_lookup(lookup(&[("HERMES_PASSWORD", "pass")])).unwrap_err();
        assert!(err.to_string().contains("HERMES_USERNAME"));

        let err = ClientConfig::from_lookup(lookup(&[
            ("HERMES_USERNAME", "user"),
            ("HERMES_PASSWORD", ""),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("HERMES_PASSWORD"));
    }

    #[test]
    fn custom_base_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HERMES_USERNAME", "user"),
            ("HERMES_PASSWORD", "pass"),
            ("HERMES_BASE_URL", "http://localhost:9000/v1/queries/"),
            ("HERMES_REQUEST_TIMEOUT_SECS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.endpoints.status("a"), "http://localhost:9000/v1/queries/a");
        assert_eq!(config.request_timeout, Duration::from_secs(12));
    }

    #[test]
    fn rejects_bad_values() {
        let base = [("HERMES_USERNAME", "user"), ("HERMES_PASSWORD", "pass")];

        let mut vars = base.to_vec();
        vars.push(("HERMES_BASE_URL", "ftp://example.com"));
        assert!(ClientConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push(("HERMES_BASE_URL", "not a url"));
        assert!(ClientConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push(("HERMES_REQUEST_TIMEOUT_SECS", "0"));
        assert!(ClientConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push(("HERMES_REQUEST_TIMEOUT_SECS", "soon"));
        assert!(ClientConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn build_validates_endpoints() {
        let config = ClientConfig::new("user", "pass")
            .with_endpoints(Endpoints::new("https://api.test/q").with_results_url("file:///tmp"));
        assert!(matches!(config.build(), Err(AppError::Config(_))));

        let client = ClientConfig::new("user", "pass").build().unwrap();
        assert_eq!(client.endpoints().submit_url, DEFAULT_BASE_URL);
    }

    /// Fake API: submit returns a job, the first status check is pending,
    /// later ones are done.
    async fn serve_api(listener: tokio::net::TcpListener) {
        use tokio::io::AsyncWriteExt;

        let mut status_checks = 0;
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let request = crate::test_http::read_request(&mut socket).await;
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

            let body = if request.starts_with("POST") {
                r#"{"id":"e2e","status":"pending"}"#.to_string()
            } else if path.ends_with("/results") {
                r#"{"results":[{"content":"<p>ok</p>","page":1,"job_id":"e2e","status_code":200}],"job":{"id":"e2e","status":"done"}}"#.to_string()
            } else {
                status_checks += 1;
                let status = if status_checks < 2 { "pending" } else { "done" };
                format!(r#"{{"id":"e2e","status":"{status}"}}"#)
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    }

    #[tokio::test]
    async fn scrape_round_trip_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/v1/queries", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_api(listener));

        let config = ClientConfig::from_lookup(lookup(&[
            ("HERMES_USERNAME", "user"),
            ("HERMES_PASSWORD", "pass"),
            ("HERMES_BASE_URL", base.as_str()),
        ]))
        .unwrap();
        let client = config.build().unwrap();

        let payload =
            hermes_core::ScrapePayload::new(br#"{"source":"universal"}"#.to_vec(), false, false);
        let poll = hermes_core::PollConfig::default()
            .with_poll_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(5));
        let decoded = client.scrape(&payload, poll).await.unwrap().await.unwrap();

        assert_eq!(decoded.job.id, "e2e");
        assert_eq!(decoded.results.raw().unwrap()[0].content, "<p>ok</p>");
        server.abort();
    }
}

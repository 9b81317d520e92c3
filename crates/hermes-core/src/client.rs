use std::sync::Arc;

use crate::decode::{decode_job_body, decode_job_id, decode_response};
use crate::error::{AppError, DecodeError, Stage};
use crate::job::Job;
use crate::models::{DecodedResponse, ResultShape};
use crate::poller::{PollReporter, TracingPollReporter};
use crate::traits::{ApiRequest, ApiResponse, Transport};

/// Default endpoint for job creation, status and results.
pub const DEFAULT_BASE_URL: &str = "https://data.oxylabs.io/v1/queries";

/// URLs of the three job endpoints.
///
/// Status is read from `<status_url>/{id}` and results from
/// `<results_url>/{id}/results`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub submit_url: String,
    pub status_url: String,
    pub results_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    /// Use one base URL for all three endpoints.
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            submit_url: base.clone(),
            status_url: base.clone(),
            results_url: base,
        }
    }

    pub fn with_submit_url(mut self, url: &str) -> Self {
        self.submit_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_status_url(mut self, url: &str) -> Self {
        self.status_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_results_url(mut self, url: &str) -> Self {
        self.results_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn status(&self, job_id: &str) -> String {
        format!("{}/{}", self.status_url, job_id)
    }

    pub fn results(&self, job_id: &str) -> String {
        format!("{}/{}/results", self.results_url, job_id)
    }
}

/// Client for the asynchronous job API.
///
/// Generic over the [`Transport`] so the lifecycle can run against a real
/// HTTP client or a scripted mock.
#[derive(Clone)]
pub struct JobClient<T: Transport> {
    pub(crate) transport: T,
    pub(crate) endpoints: Endpoints,
    pub(crate) reporter: Arc<dyn PollReporter>,
}

impl<T: Transport> JobClient<T> {
    pub fn new(transport: T, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
            reporter: Arc::new(TracingPollReporter),
        }
    }

    /// Replace the reporter that receives poll lifecycle events.
    pub fn with_reporter(mut self, reporter: impl PollReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Create a job from a serialized payload and return its id.
    ///
    /// Only the `id` field of the response is read. A single failure is
    /// returned as-is; resubmitting is up to the caller.
    pub async fn submit(&self, payload: &[u8]) -> Result<String, AppError> {
        let request = ApiRequest::post_json(self.endpoints.submit_url.as_str(), payload);
        let response = self.send(Stage::Submit, None, request).await?;

        let job_id = decode_job_id(&response.body)
            .map_err(|e| decode_error(Stage::Submit, None, e, &response))?;

        tracing::info!(%job_id, "Job submitted");
        Ok(job_id)
    }

    /// Read the current state of a job.
    pub async fn job_status(&self, job_id: &str) -> Result<Job, AppError> {
        let request = ApiRequest::get(self.endpoints.status(job_id));
        let response = self.send(Stage::Status, Some(job_id), request).await?;

        decode_job_body(&response.body)
            .map_err(|e| decode_error(Stage::Status, Some(job_id), e, &response))
    }

    /// Download and decode the results of a finished job.
    pub async fn fetch_results(
        &self,
        job_id: &str,
        shape: ResultShape,
    ) -> Result<DecodedResponse, AppError> {
        let request = ApiRequest::get(self.endpoints.results(job_id));
        let response = self.send(Stage::Results, Some(job_id), request).await?;

        let decoded = decode_response(&response.body, shape, response.status_code, &response.status)
            .map_err(|e| decode_error(Stage::Results, Some(job_id), e, &response))?;

        tracing::info!(
            %job_id,
            %shape,
            entries = decoded.results.len(),
            "Results decoded"
        );
        Ok(decoded)
    }

    /// Send one request and turn transport failures and non-2xx statuses into errors.
    async fn send(
        &self,
        stage: Stage,
        job_id: Option<&str>,
        request: ApiRequest,
    ) -> Result<ApiResponse, AppError> {
        tracing::debug!(%stage, method = %request.method, url = %request.url, "Sending request");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.at(stage, job_id))?;

        if !response.is_success() {
            return Err(AppError::ApiStatus {
                stage,
                job_id: job_id.map(str::to_string),
                status_code: response.status_code,
                body: response.body_text(),
            });
        }

        Ok(response)
    }
}

fn decode_error(
    stage: Stage,
    job_id: Option<&str>,
    source: DecodeError,
    response: &ApiResponse,
) -> AppError {
    AppError::Decode {
        stage,
        job_id: job_id.map(str::to_string),
        source,
        body: response.body_text(),
    }
}

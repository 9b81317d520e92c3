//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::poller::{PollEvent, PollReporter, PollState};
use crate::traits::{ApiRequest, ApiResponse, Transport};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

type Scripted = Result<ApiResponse, TransportError>;

/// Mock transport that replays scripted responses in order and records
/// every request it receives.
#[derive(Clone)]
pub struct MockTransport {
    /// Queue of responses. Each call pops the first element.
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    /// Returned once the queue is exhausted.
    fallback: Arc<Mutex<Option<Scripted>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn with_responses(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            fallback: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Transport that answers every request with the same response.
    pub fn always(response: ApiResponse) -> Self {
        Self::with_responses(Vec::new()).with_fallback(Ok(response))
    }

    pub fn with_fallback(self, response: Scripted) -> Self {
        *self.fallback.lock().unwrap() = Some(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);

        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        match self.fallback.lock().unwrap().as_ref() {
            Some(response) => response.clone(),
            None => Err(TransportError::new("MockTransport: no scripted response left")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockPollReporter
// ---------------------------------------------------------------------------

/// Mock poll reporter that records events.
#[derive(Clone, Default)]
pub struct MockPollReporter {
    events: Arc<Mutex<Vec<String>>>,
    transitions: Arc<Mutex<Vec<(PollState, PollState)>>>,
    finished: Arc<Mutex<Option<PollState>>>,
}

impl MockPollReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every reported event, in order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// State changes in the order they happened.
    pub fn transitions(&self) -> Vec<(PollState, PollState)> {
        self.transitions.lock().unwrap().clone()
    }

    /// State reported by the `Finished` event, if the loop has ended.
    pub fn final_state(&self) -> Option<PollState> {
        *self.finished.lock().unwrap()
    }
}

impl PollReporter for MockPollReporter {
    fn report(&self, event: PollEvent<'_>) {
        let label = match &event {
            PollEvent::Started { .. } => "Started",
            PollEvent::StateChanged { from, to, .. } => {
                self.transitions.lock().unwrap().push((*from, *to));
                "StateChanged"
            }
            PollEvent::StatusChecked { .. } => "StatusChecked",
            PollEvent::Waiting { .. } => "Waiting",
            PollEvent::Finished { state, .. } => {
                *self.finished.lock().unwrap() = Some(*state);
                "Finished"
            }
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Response with an arbitrary text body.
pub fn text_response(status_code: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status_code,
        status: status_line(status_code),
        body: body.as_bytes().to_vec(),
    }
}

pub fn json_response(status_code: u16, body: &serde_json::Value) -> ApiResponse {
    text_response(status_code, &body.to_string())
}

/// `200 OK` job object as returned by the submit and status endpoints.
pub fn job_response(id: &str, status: &str) -> ApiResponse {
    json_response(
        200,
        &serde_json::json!({
            "id": id,
            "status": status,
            "source": "universal",
            "created_at": "2024-03-01 10:15:30",
            "updated_at": "2024-03-01 10:15:31",
        }),
    )
}

/// `200 OK` results body with one raw entry per content string, pages 1..n.
pub fn raw_results_response(job_id: &str, contents: &[&str]) -> ApiResponse {
    let results: Vec<_> = contents
        .iter()
        .enumerate()
        .map(|(i, content)| {
            serde_json::json!({
                "content": content,
                "page": i + 1,
                "url": "http://x",
                "job_id": job_id,
                "status_code": 200,
            })
        })
        .collect();
    json_response(
        200,
        &serde_json::json!({
            "results": results,
            "job": {"id": job_id, "status": "done"},
        }),
    )
}

fn status_line(status_code: u16) -> String {
    let reason = match status_code {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    };
    format!("{status_code} {reason}").trim_end().to_string()
}

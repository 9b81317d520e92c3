use hermes_core::testutil::{MockPollReporter, MockTransport};
use hermes_core::{Endpoints, JobClient};

pub const BASE_URL: &str = "https://api.test/v1/queries";

/// Client wired to a scripted transport and a recording reporter.
pub fn setup_client(transport: MockTransport) -> (JobClient<MockTransport>, MockPollReporter) {
    let reporter = MockPollReporter::new();
    let client =
        JobClient::new(transport, Endpoints::new(BASE_URL)).with_reporter(reporter.clone());
    (client, reporter)
}

/// Results body where every entry carries the same `content` value.
pub fn results_body(job_id: &str, content: serde_json::Value, count: usize) -> serde_json::Value {
    let results: Vec<_> = (1..=count)
        .map(|page| {
            serde_json::json!({
                "content": content,
                "created_at": "2024-03-01 10:15:30",
                "updated_at": "2024-03-01 10:16:00",
                "page": page,
                "url": format!("https://example.com/?page={page}"),
                "job_id": job_id,
                "status_code": 200,
            })
        })
        .collect();
    serde_json::json!({
        "results": results,
        "job": {"id": job_id, "status": "done", "source": "universal"},
    })
}

use std::time::Duration;

use hermes_core::testutil::{MockTransport, job_response, json_response, text_response};
use hermes_core::{AppError, Method, PollConfig, PollState, ScrapePayload, Stage};

use crate::integration::common::{BASE_URL, results_body, setup_client};

#[tokio::test(start_paused = true)]
async fn submit_pending_done_yields_raw_entry() {
    let results = serde_json::json!({
        "results": [{"content": "hi", "page": 1, "url": "http://x", "job_id": "7x1", "status_code": 200}],
        "job": {"id": "7x1", "status": "done"}
    });
    let transport = MockTransport::with_responses(vec![
        Ok(job_response("7x1", "pending")),
        Ok(job_response("7x1", "pending")),
        Ok(job_response("7x1", "done")),
        Ok(json_response(200, &results)),
    ]);
    let (client, reporter) = setup_client(transport.clone());

    let payload = ScrapePayload::from_json(&serde_json::json!({
        "source": "universal",
        "url": "http://x"
    }))
    .unwrap();
    let handle = client.scrape(&payload, PollConfig::default()).await.unwrap();
    let decoded = handle.await.unwrap();

    let entries = decoded.results.raw().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "hi");
    assert_eq!(entries[0].page, 1);
    assert_eq!(entries[0].job_id, "7x1");
    assert_eq!(decoded.job.id, "7x1");
    assert_eq!(reporter.final_state(), Some(PollState::Done));

    let requests = transport.requests();
    let calls: Vec<_> = requests
        .iter()
        .map(|r| (r.method, r.url.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            (Method::Post, BASE_URL),
            (Method::Get, "https://api.test/v1/queries/7x1"),
            (Method::Get, "https://api.test/v1/queries/7x1"),
            (Method::Get, "https://api.test/v1/queries/7x1/results"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn results_keep_server_length_and_order() {
    let body = results_body("ord", serde_json::json!("page"), 5);
    let transport = MockTransport::with_responses(vec![
        Ok(job_response("ord", "pending")),
        Ok(job_response("ord", "done")),
        Ok(json_response(200, &body)),
    ]);
    let (client, _) = setup_client(transport);

    let payload = ScrapePayload::new(b"{}".to_vec(), false, false);
    let decoded = client
        .scrape(&payload, PollConfig::default())
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(decoded.results.len(), 5);
    assert_eq!(decoded.results.pages(), vec![1, 2, 3, 4, 5]);
    let urls: Vec<_> = decoded
        .results
        .raw()
        .unwrap()
        .iter()
        .map(|e| e.url.clone())
        .collect();
    assert_eq!(urls[4], "https://example.com/?page=5");
}

#[tokio::test(start_paused = true)]
async fn faulted_job_never_produces_results() {
    let transport = MockTransport::with_responses(vec![
        Ok(job_response("bad", "pending")),
        Ok(job_response("bad", "pending")),
        Ok(job_response("bad", "faulted")),
    ])
    .with_fallback(Ok(job_response("bad", "done")));
    let (client, reporter) = setup_client(transport.clone());

    let payload = ScrapePayload::new(b"{}".to_vec(), false, false);
    let err = client
        .scrape(&payload, PollConfig::default())
        .await
        .unwrap()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::JobFaulted { .. }));
    assert_eq!(err.job_id(), Some("bad"));
    assert_eq!(reporter.final_state(), Some(PollState::Faulted));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn timeout_stops_all_requests() {
    let transport = MockTransport::with_responses(vec![Ok(job_response("slow", "pending"))])
        .with_fallback(Ok(job_response("slow", "pending")));
    let (client, reporter) = setup_client(transport.clone());

    let config = PollConfig::default()
        .with_poll_interval(Duration::from_secs(1))
        .with_timeout(Duration::from_secs(4));
    let payload = ScrapePayload::new(b"{}".to_vec(), false, false);
    let err = client
        .scrape(&payload, config)
        .await
        .unwrap()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PollTimeout { cancelled: false, .. }));
    assert_eq!(reporter.final_state(), Some(PollState::TimedOut));

    let after_timeout = transport.request_count();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.request_count(), after_timeout);
}

#[tokio::test(start_paused = true)]
async fn results_endpoint_error_carries_body() {
    let transport = MockTransport::with_responses(vec![
        Ok(job_response("e", "done")),
        Ok(job_response("e", "done")),
        Ok(text_response(404, r#"{"message":"Job not found"}"#)),
    ]);
    let (client, _) = setup_client(transport);

    let payload = ScrapePayload::new(b"{}".to_vec(), false, false);
    let err = client
        .scrape(&payload, PollConfig::default())
        .await
        .unwrap()
        .await
        .unwrap_err();

    match err {
        AppError::ApiStatus {
            stage,
            job_id,
            status_code,
            body,
        } => {
            assert_eq!(stage, Stage::Results);
            assert_eq!(job_id.as_deref(), Some("e"));
            assert_eq!(status_code, 404);
            assert!(body.contains("Job not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn malformed_entry_fails_through_handle() {
    let body = serde_json::json!({
        "results": [{"content": "ok", "page": 1}, {"page": 2}],
        "job": {"id": "m", "status": "done"}
    });
    let transport = MockTransport::with_responses(vec![
        Ok(job_response("m", "done")),
        Ok(job_response("m", "done")),
        Ok(json_response(200, &body)),
    ]);
    let (client, _) = setup_client(transport);

    let payload = ScrapePayload::new(b"{}".to_vec(), false, false);
    let err = client
        .scrape(&payload, PollConfig::default())
        .await
        .unwrap()
        .await
        .unwrap_err();

    match err {
        AppError::Decode { stage, source, .. } => {
            assert_eq!(stage, Stage::Results);
            assert_eq!(source.entry_index(), Some(1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

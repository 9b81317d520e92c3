use hermes_core::decode::decode_response;
use hermes_core::models::ParsedContent;
use hermes_core::testutil::{MockTransport, job_response, json_response};
use hermes_core::{PollConfig, ResultShape, ScrapePayload};

use crate::integration::common::{results_body, setup_client};

fn parsed_content() -> serde_json::Value {
    serde_json::json!({
        "url": "https://www.google.com/search?q=shoes",
        "page": 1,
        "results": {
            "organic": [
                {"pos": 1, "url": "https://a.example", "title": "A", "desc": "first"},
                {"pos": 2, "url": "https://b.example", "title": "B", "desc": "second"}
            ],
            "total_results_count": 2
        },
        "last_visible_page": 3,
        "parse_status_code": 12000
    })
}

async fn scrape_with_flags(
    parse: bool,
    custom: bool,
    content: serde_json::Value,
) -> hermes_core::DecodedResponse {
    let transport = MockTransport::with_responses(vec![
        Ok(job_response("s", "pending")),
        Ok(job_response("s", "done")),
        Ok(json_response(200, &results_body("s", content, 2))),
    ]);
    let (client, _) = setup_client(transport);
    let payload = ScrapePayload::new(b"{}".to_vec(), parse, custom);

    client
        .scrape(&payload, PollConfig::default())
        .await
        .unwrap()
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn raw_flags_fill_only_raw_variant() {
    let decoded = scrape_with_flags(false, false, serde_json::json!("<html></html>")).await;

    assert_eq!(decoded.results.shape(), ResultShape::Raw);
    assert!(decoded.results.parsed().is_none());
    assert!(decoded.results.custom().is_none());
    assert_eq!(decoded.results.raw().unwrap()[1].content, "<html></html>");
}

#[tokio::test(start_paused = true)]
async fn raw_flag_ignores_custom_flag() {
    let decoded = scrape_with_flags(false, true, serde_json::json!("<html></html>")).await;
    assert_eq!(decoded.results.shape(), ResultShape::Raw);
}

#[tokio::test(start_paused = true)]
async fn parse_flag_fills_only_parsed_variant() {
    let decoded = scrape_with_flags(true, false, parsed_content()).await;

    assert_eq!(decoded.results.shape(), ResultShape::Parsed);
    assert!(decoded.results.raw().is_none());
    assert!(decoded.results.custom().is_none());
    let entries = decoded.results.parsed().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content.results.organic[1].title, "B");
    assert_eq!(entries[0].content.parse_status_code, 12000);
}

#[tokio::test(start_paused = true)]
async fn custom_flags_fill_only_custom_variant() {
    let decoded = scrape_with_flags(true, true, parsed_content()).await;

    assert_eq!(decoded.results.shape(), ResultShape::CustomParsed);
    assert!(decoded.results.raw().is_none());
    assert!(decoded.results.parsed().is_none());
    let entry = &decoded.results.custom().unwrap()[0];
    assert_eq!(entry.content["results"]["organic"][0]["url"], "https://a.example");
}

#[test]
fn redecoding_same_bytes_is_deterministic() {
    let body = serde_json::to_vec(&results_body("d", parsed_content(), 3)).unwrap();

    for shape in [ResultShape::Parsed, ResultShape::CustomParsed] {
        let first = decode_response(&body, shape, 200, "200 OK").unwrap();
        let second = decode_response(&body, shape, 200, "200 OK").unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn parsed_shape_decodes_typed_content() {
    let body = serde_json::to_vec(&results_body("d", parsed_content(), 1)).unwrap();
    let decoded = decode_response(&body, ResultShape::Parsed, 200, "200 OK").unwrap();
    let content: &ParsedContent = &decoded.results.parsed().unwrap()[0].content;
    assert_eq!(content.last_visible_page, 3);
    assert_eq!(content.results.total_results_count, 2);
}

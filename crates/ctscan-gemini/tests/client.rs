//! Integration tests for `GeminiClient` using wiremock HTTP mocks.

use ctscan_core::LocationCoords;
use ctscan_gemini::{GeminiClient, GeminiError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn test_client(base_url: &str) -> GeminiClient {
    GeminiClient::with_base_url("test-key", "gemini-2.5-flash", 5, "ctscan-test/0.1", base_url)
        .expect("client construction should not fail")
}

/// Wraps `text` in a one-candidate `generateContent` response.
fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn find_pincodes_sends_search_tool_and_parses_fenced_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "tools": [{ "googleSearch": {} }],
            "generationConfig": { "temperature": 0.1 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            "```json\n{\"pincodes\": [\"110001\", \"110001\", \"110002\"]}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let pincodes = client.find_pincodes("Delhi").await.expect("pincodes");

    assert_eq!(pincodes, vec!["110001", "110002"]);
}

#[tokio::test]
async fn find_pincodes_falls_back_to_pattern_scan() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            "The main pincodes are 400001 and 400002.",
        )))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let pincodes = client.find_pincodes("Mumbai").await.expect("pincodes");

    assert_eq!(pincodes, vec!["400001", "400002"]);
}

#[tokio::test]
async fn find_pincodes_reports_unparseable_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_response("Sorry, I cannot help with that.")),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.find_pincodes("Atlantis").await;

    assert!(
        matches!(result, Err(GeminiError::UnparseablePincodes)),
        "expected UnparseablePincodes, got: {result:?}"
    );
}

#[tokio::test]
async fn find_pincodes_empty_candidate_list_is_zero_codes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let pincodes = client.find_pincodes("Nowhere").await.expect("pincodes");

    assert!(pincodes.is_empty());
}

#[tokio::test]
async fn api_error_status_is_surfaced_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.find_pincodes("Delhi").await;

    match result {
        Err(GeminiError::Api { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "PERMISSION_DENIED: API key not valid");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn error_envelope_on_success_status_uses_its_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 429, "message": "quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.find_pincodes("Delhi").await;

    match result {
        Err(GeminiError::Api { status, message }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "RESOURCE_EXHAUSTED: quota exceeded");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.find_pincodes("Delhi").await;

    assert!(matches!(result, Err(GeminiError::Deserialize { .. })));
}

#[tokio::test]
async fn find_scan_centers_sends_maps_tool_with_location_bias() {
    let server = MockServer::start().await;

    let answer = r#"```json
[
  {"name": "Jehangir Imaging", "address": "Sassoon Rd", "pincode": "411001",
   "contactNumber": "020-1111", "googleRating": "4.6", "mapLink": "https://maps.example/j",
   "website": "", "ctAvailable": true},
  {"name": "Ruby Hall Clinic", "pincode": "411001", "ctAvailable": false}
]
```"#;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({
            "tools": [{ "googleMaps": {} }],
            "toolConfig": { "retrievalConfig": { "latLng": { "latitude": 18.52, "longitude": 73.85 } } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(answer)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let location = LocationCoords {
        latitude: 18.52,
        longitude: 73.85,
    };
    let centers = client
        .find_scan_centers("411001", "Pune", Some(location))
        .await
        .expect("centers");

    assert_eq!(centers.len(), 2);
    assert_eq!(centers[0].name, "Jehangir Imaging");
    assert!((centers[0].google_rating - 4.6).abs() < 1e-9);
    assert!(!centers[1].ct_available);
}

#[tokio::test]
async fn find_scan_centers_non_array_payload_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_response(r#"{"error": "none"}"#)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.find_scan_centers("411001", "Pune", None).await;

    assert!(matches!(result, Err(GeminiError::UnexpectedPayload { .. })));
}

use super::*;

// -----------------------------------------------------------------------
// strip_code_fence
// -----------------------------------------------------------------------

#[test]
fn strip_fence_leaves_plain_text_trimmed() {
    assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
}

#[test]
fn strip_fence_removes_json_fence() {
    let text = "```json\n{\"pincodes\": [\"110001\"]}\n```";
    assert_eq!(strip_code_fence(text), "{\"pincodes\": [\"110001\"]}");
}

#[test]
fn strip_fence_removes_bare_fence() {
    assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
}

#[test]
fn strip_fence_removes_inline_json_fence() {
    assert_eq!(strip_code_fence("```json[1]```"), "[1]");
}

#[test]
fn strip_fence_tolerates_missing_closing_fence() {
    assert_eq!(strip_code_fence("```json\n[1, 2]"), "[1, 2]");
}

// -----------------------------------------------------------------------
// parse_pincodes
// -----------------------------------------------------------------------

#[test]
fn pincodes_from_json_object() {
    let codes = parse_pincodes(r#"{"pincodes": ["110001", "110002"]}"#).expect("parse");
    assert_eq!(codes, vec!["110001", "110002"]);
}

#[test]
fn pincodes_are_deduplicated_in_order() {
    let codes = parse_pincodes(r#"{"pincodes": ["110002", "110001", "110002"]}"#).expect("parse");
    assert_eq!(codes, vec!["110002", "110001"]);
}

#[test]
fn pincodes_filter_out_malformed_entries() {
    let codes =
        parse_pincodes(r#"{"pincodes": ["110001", "1100", 110003, "11000a", "1100045"]}"#)
            .expect("parse");
    assert_eq!(codes, vec!["110001"]);
}

#[test]
fn pincodes_inside_markdown_fence() {
    let text = "```json\n{\"pincodes\": [\"400001\"]}\n```";
    assert_eq!(parse_pincodes(text).expect("parse"), vec!["400001"]);
}

#[test]
fn pincodes_empty_text_is_empty_not_error() {
    assert!(parse_pincodes("   ").expect("parse").is_empty());
}

#[test]
fn pincodes_json_without_key_is_empty_not_error() {
    assert!(parse_pincodes(r#"{"codes": ["110001"]}"#)
        .expect("parse")
        .is_empty());
    assert!(parse_pincodes(r#"["110001"]"#).expect("parse").is_empty());
}

#[test]
fn pincodes_fall_back_to_pattern_scan() {
    let text = "Delhi pincodes include 110001, 110002 and 110001 again.";
    assert_eq!(parse_pincodes(text).expect("parse"), vec!["110001", "110002"]);
}

#[test]
fn pincode_fallback_ignores_longer_digit_runs() {
    let text = "Call 9876543210 for pincode 560001";
    assert_eq!(parse_pincodes(text).expect("parse"), vec!["560001"]);
}

#[test]
fn pincode_fallback_does_not_split_glued_digit_runs() {
    for text in ["Pincode: 1100011", "Codes 110001110002"] {
        assert!(
            matches!(parse_pincodes(text), Err(GeminiError::UnparseablePincodes)),
            "{text}"
        );
    }
    assert_eq!(
        parse_pincodes("(110001)/110002.").expect("parse"),
        vec!["110001", "110002"]
    );
}

#[test]
fn pincodes_unparseable_text_is_error() {
    let result = parse_pincodes("I could not find any postal codes for that city.");
    assert!(matches!(result, Err(GeminiError::UnparseablePincodes)));
}

// -----------------------------------------------------------------------
// parse_centers
// -----------------------------------------------------------------------

#[test]
fn centers_from_fenced_array() {
    let text = r#"```json
[
  {"name": "Apollo Diagnostics", "address": "Sector 5", "pincode": "110001",
   "contactNumber": "011-5555", "googleRating": 4.3, "mapLink": "https://maps.example/a",
   "website": "https://apollo.example", "ctAvailable": true}
]
```"#;
    let centers = parse_centers(text, "110001").expect("parse");
    assert_eq!(centers.len(), 1);
    assert_eq!(centers[0].name, "Apollo Diagnostics");
    assert!(centers[0].ct_available);
}

#[test]
fn centers_empty_text_is_empty() {
    assert!(parse_centers("", "110001").expect("parse").is_empty());
}

#[test]
fn centers_skip_unreadable_elements() {
    let text = r#"[{"name": "Good"}, "stray string", {"name": {"nested": true}}, {"name": "Also good"}]"#;
    let centers = parse_centers(text, "110001").expect("parse");
    let names: Vec<&str> = centers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Good", "Also good"]);
}

#[test]
fn centers_non_array_is_unexpected_payload() {
    let result = parse_centers(r#"{"centers": []}"#, "110001");
    assert!(matches!(
        result,
        Err(GeminiError::UnexpectedPayload { ref context, .. }) if context == "110001"
    ));
}

#[test]
fn centers_invalid_json_is_deserialize_error() {
    let result = parse_centers("Here are some centers: Apollo, Max", "110001");
    assert!(matches!(result, Err(GeminiError::Deserialize { .. })));
}

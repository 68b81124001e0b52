//! Readers for model text that is expected to hold JSON.
//!
//! Grounded requests cannot ask for a response schema, so the model wraps
//! its answer in markdown fences or prose often enough that every reader
//! here starts with [`strip_code_fence`].

use std::collections::HashSet;
use std::sync::LazyLock;

use ctscan_core::ScanCenter;
use regex::Regex;
use serde_json::Value;

use crate::error::GeminiError;

static PINCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{6}\b").expect("valid pincode regex"));

/// Returns `true` for exactly six ASCII digits.
#[must_use]
pub fn is_pincode(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Remove a surrounding markdown code fence, if any, and trim.
///
/// Handles ```` ```json ````, any other single-word info string, and a bare
/// ```` ``` ````. A missing closing fence is tolerated.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop an info string such as `json` when it sits alone on the first line.
    let rest = match rest.split_once('\n') {
        Some((info, body)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };

    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a pincode answer.
///
/// Strategy:
/// 1. Empty text → no pincodes.
/// 2. Valid JSON → the string entries of its `pincodes` array that are six
///    digits. Valid JSON without that array → no pincodes.
/// 3. Invalid JSON → every standalone six-digit run in the text.
///
/// Duplicates are removed, keeping first-seen order.
///
/// # Errors
///
/// Returns [`GeminiError::UnparseablePincodes`] when the text is not JSON and
/// the fallback finds nothing.
pub fn parse_pincodes(text: &str) -> Result<Vec<String>, GeminiError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let Some(entries) = value.get("pincodes").and_then(Value::as_array) else {
                tracing::debug!("pincode JSON has no `pincodes` array");
                return Ok(Vec::new());
            };
            Ok(dedupe(
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|p| is_pincode(p)),
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "pincode response is not JSON, falling back to pattern scan");
            let found = dedupe(PINCODE_RE.find_iter(body).map(|m| m.as_str()));
            if found.is_empty() {
                Err(GeminiError::UnparseablePincodes)
            } else {
                Ok(found)
            }
        }
    }
}

/// Parse a scan-center answer.
///
/// The payload must be a JSON array. Elements that cannot be read as a
/// [`ScanCenter`] are skipped individually so one malformed record does not
/// discard the rest.
///
/// # Errors
///
/// - [`GeminiError::Deserialize`] if the text is not JSON.
/// - [`GeminiError::UnexpectedPayload`] if the JSON is not an array.
pub fn parse_centers(text: &str, context: &str) -> Result<Vec<ScanCenter>, GeminiError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(body).map_err(|e| GeminiError::Deserialize {
        context: context.to_string(),
        source: e,
    })?;

    let Value::Array(items) = value else {
        return Err(GeminiError::UnexpectedPayload {
            context: context.to_string(),
            reason: "expected a JSON array of centers".to_string(),
        });
    };

    let total = items.len();
    let centers: Vec<ScanCenter> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ScanCenter>(item).ok())
        .collect();
    if centers.len() < total {
        tracing::debug!(
            context,
            skipped = total - centers.len(),
            "skipped unreadable center records"
        );
    }
    Ok(centers)
}

fn dedupe<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .filter(|code| seen.insert(*code))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;

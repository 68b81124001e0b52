use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id for one API call; echoed in every response `meta`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Tags each request with a [`RequestId`] extension and mirrors it in the
/// `x-request-id` response header. A caller-supplied id is kept when it is
/// non-empty printable ASCII of reasonable length; otherwise a UUID v4 is
/// generated.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = incoming_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::debug!(request_id = %id, method = %req.method(), path = %req.uri().path(), "request");

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}

fn incoming_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn keeps_a_well_formed_incoming_id() {
        assert_eq!(incoming_id(&headers(" req-42 ")), Some("req-42".to_string()));
    }

    #[test]
    fn ignores_missing_blank_or_oversized_ids() {
        assert_eq!(incoming_id(&HeaderMap::new()), None);
        assert_eq!(incoming_id(&headers("   ")), None);
        assert_eq!(incoming_id(&headers("has space")), None);
        assert_eq!(incoming_id(&headers(&"x".repeat(129))), None);
    }
}

//! HTTP message types used by the admission gates.
//!
//! The gates operate on plain `http` request/response values with fully
//! buffered bodies; transport framing lives outside this repository.

use bytes::Bytes;
use http::header::HeaderName;
use http_body_util::{BodyExt, Full};

/// Header carrying the client-supplied idempotency key.
pub static IDEMPOTENCY_KEY_HEADER: HeaderName = HeaderName::from_static("idempotency-key");

/// The HTTP request type flowing through the admission pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by the pipeline and downstream handlers.
pub type Response = http::Response<Full<Bytes>>;

/// Splits a response into its parts and fully collected body bytes.
///
/// Used to snapshot a handler response before caching it for idempotent
/// replay; the body is rebuilt from the same bytes afterwards.
pub async fn into_body_bytes(response: Response) -> (http::response::Parts, Bytes) {
    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    (parts, bytes)
}

/// Extension trait for building pipeline-generated responses.
pub trait ResponseExt {
    /// Creates a JSON error response with the given status and reason.
    ///
    /// The body shape is `{"error": "<reason>"}`, matching what clients of
    /// the admission layer are documented to expect.
    fn rejection(status: http::StatusCode, reason: &str) -> Response;

    /// Rebuilds a response from a cached status code and body.
    fn replay(status: http::StatusCode, body: Bytes) -> Response;
}

impl ResponseExt for Response {
    fn rejection(status: http::StatusCode, reason: &str) -> Response {
        let body = serde_json::json!({ "error": reason });

        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .expect("failed to build rejection response")
    }

    fn replay(status: http::StatusCode, body: Bytes) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(body))
            .expect("failed to build replayed response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_into_body_bytes_round_trips() {
        let response: Response = http::Response::builder()
            .status(StatusCode::CREATED)
            .body(Full::new(Bytes::from_static(b"{\"id\":1}")))
            .unwrap();

        let (parts, bytes) = tokio_test::block_on(into_body_bytes(response));
        assert_eq!(parts.status, StatusCode::CREATED);
        assert_eq!(bytes.as_ref(), b"{\"id\":1}");
    }

    #[test]
    fn test_rejection_body_shape() {
        let response = Response::rejection(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_replay_preserves_bytes() {
        let cached = Bytes::from_static(b"{\"id\":42}");
        let response = Response::replay(StatusCode::CREATED, cached.clone());

        let (parts, bytes) = tokio_test::block_on(into_body_bytes(response));
        assert_eq!(parts.status, StatusCode::CREATED);
        assert_eq!(bytes, cached);
    }
}

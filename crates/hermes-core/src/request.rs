//! Request representation.

use bytes::Bytes;
use http::header::CONNECTION;
use http::{HeaderMap, Version};

/// The request handed to handlers.
///
/// Buffered handlers receive the complete body; streaming handlers receive
/// the head with an empty body and consume the payload through their
/// [`BodyConsumer`](crate::BodyConsumer).
pub type HttpRequest = http::Request<Bytes>;

/// Whether a request asks for a persistent connection.
///
/// HTTP/1.1 defaults to keep-alive unless `Connection: close` is present;
/// HTTP/1.0 defaults to close unless `Connection: keep-alive` is present.
#[must_use]
pub fn is_keep_alive(version: Version, headers: &HeaderMap) -> bool {
    let connection = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    match version {
        Version::HTTP_10 => connection.eq_ignore_ascii_case("keep-alive"),
        _ => !connection.eq_ignore_ascii_case("close"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_http11_defaults_to_keep_alive() {
        assert!(is_keep_alive(Version::HTTP_11, &HeaderMap::new()));
    }

    #[test]
    fn test_http11_close_requested() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        assert!(!is_keep_alive(Version::HTTP_11, &headers));
    }

    #[test]
    fn test_http10_defaults_to_close() {
        assert!(!is_keep_alive(Version::HTTP_10, &HeaderMap::new()));

        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        assert!(is_keep_alive(Version::HTTP_10, &headers));
    }
}

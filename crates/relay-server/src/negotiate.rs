//! Gatekeeping that runs before any engine work: cross-origin admission,
//! preflight short-circuit and the streaming capability check.

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
    },
    HeaderName, Method, Version,
};

use crate::error::ApiError;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// What to do with an inbound request after cross-origin admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Answer with 204 and stop
    Preflight,
    Proceed,
}

/// Headers every response carries, errors and preflights included.
pub fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
        (ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
        (ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
    ]
}

pub fn admit(method: &Method) -> Admission {
    if *method == Method::OPTIONS {
        Admission::Preflight
    } else {
        Admission::Proceed
    }
}

/// Incremental delivery needs chunked transfer or HTTP/2 framing. HTTP/1.0
/// and earlier have neither, so they are refused an event stream.
///
/// hyper could still stream to an HTTP/1.0 client by closing the connection
/// at the end of the body, but that contradicts the `Connection: keep-alive`
/// header the stream advertises.
pub fn ensure_streaming(version: Version) -> Result<(), ApiError> {
    if version == Version::HTTP_09 || version == Version::HTTP_10 {
        return Err(ApiError::StreamingUnsupported);
    }
    Ok(())
}

pub fn event_stream_headers() -> [(HeaderName, &'static str); 3] {
    [
        (CONTENT_TYPE, "text/event-stream"),
        (CACHE_CONTROL, "no-cache"),
        (CONNECTION, "keep-alive"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_options_is_preflight() {
        assert_eq!(admit(&Method::OPTIONS), Admission::Preflight);
        assert_eq!(admit(&Method::POST), Admission::Proceed);
        assert_eq!(admit(&Method::GET), Admission::Proceed);
    }

    #[test]
    fn test_streaming_needs_http_11() {
        assert!(ensure_streaming(Version::HTTP_11).is_ok());
        assert!(ensure_streaming(Version::HTTP_2).is_ok());
        assert!(matches!(
            ensure_streaming(Version::HTTP_10),
            Err(ApiError::StreamingUnsupported)
        ));
        assert!(matches!(
            ensure_streaming(Version::HTTP_09),
            Err(ApiError::StreamingUnsupported)
        ));
    }
}

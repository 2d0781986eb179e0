//! Status-to-error mapping.
//!
//! A pure function of status, body bytes and headers. No retry or backoff
//! happens here.

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::Duration;

use sens_core::{ErrorBody, ErrorDetail, ErrorKind, RateLimitInfo, Result, SensError};

use crate::transport::RawResponse;

pub const RETRY_AFTER: &str = "retry-after";
pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Translate a non-2xx response into one of the eight error kinds
pub fn map_error(status: u16, body: &[u8], headers: &HeaderMap) -> SensError {
    // Unparseable bodies count as empty objects
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let kind = ErrorKind::from_status(status);

    let detail = ErrorDetail {
        message: parsed
            .message
            .unwrap_or_else(|| format!("HTTP {}", status)),
        code: parsed.code,
        details: parsed.details,
        request_id: parsed.request_id,
        status: Some(status),
        error: parsed.error,
    };

    let retry_after = match kind {
        ErrorKind::RateLimit | ErrorKind::ServiceUnavailable => parse_retry_after(headers),
        _ => None,
    };
    let limits = match kind {
        ErrorKind::RateLimit => parse_rate_limit(headers),
        _ => None,
    };

    SensError::from_parts(kind, detail, retry_after, limits)
}

/// `Retry-After` in whole seconds; absent or unparseable yields `None`
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            tracing::debug!(value = raw, "ignoring non-numeric Retry-After");
            None
        }
    }
}

pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    let info = RateLimitInfo {
        limit: number(RATE_LIMIT_LIMIT),
        remaining: number(RATE_LIMIT_REMAINING),
        reset: number(RATE_LIMIT_RESET),
    };
    (!info.is_empty()).then_some(info)
}

/// Decode a response: 2xx bodies into `T`, everything else into an error
pub(crate) fn decode<T: DeserializeOwned>(response: RawResponse) -> Result<T> {
    if !response.is_success() {
        return Err(map_error(response.status, &response.body, &response.headers));
    }

    let value: serde_json::Value = serde_json::from_slice(&response.body)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));

    serde_json::from_value(value).map_err(|e| {
        let mut err = SensError::generic(
            format!("unexpected response body (HTTP {})", response.status),
            e,
        );
        if let SensError::Generic { detail, .. } = &mut err {
            detail.status = Some(response.status);
        }
        err
    })
}

/// Like [`decode`] for responses whose body carries nothing (e.g. 204)
pub(crate) fn expect_success(response: RawResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(map_error(response.status, &response.body, &response.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn body(code: &str, message: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "error": "request_failed",
            "code": code,
            "message": message,
            "details": {"field": "query"},
            "request_id": "req_123"
        }))
        .unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_every_documented_status_maps_to_its_kind() {
        let cases = [
            (400, ErrorKind::Validation),
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Authentication),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (413, ErrorKind::PayloadTooLarge),
            (429, ErrorKind::RateLimit),
            (503, ErrorKind::ServiceUnavailable),
            (500, ErrorKind::Generic),
            (502, ErrorKind::Generic),
        ];

        for (status, kind) in cases {
            let err = map_error(status, &body("SENS_042", "Something went wrong"), &HeaderMap::new());
            assert_eq!(err.kind(), kind, "status {}", status);
            assert_eq!(err.code(), Some("SENS_042"));
            assert_eq!(err.message(), "Something went wrong");
            assert_eq!(err.status(), Some(status));
            assert_eq!(err.request_id(), Some("req_123"));
            assert_eq!(err.details().and_then(|d| d.get("field")), Some(&json!("query")));
        }
    }

    #[test]
    fn test_retry_after_present() {
        let err = map_error(
            429,
            &body("SENS_429", "Rate limit exceeded"),
            &headers(&[
                ("retry-after", "30"),
                ("x-ratelimit-limit", "100"),
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", "1705315800"),
            ]),
        );
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(
            err.rate_limit(),
            Some(&RateLimitInfo {
                limit: Some(100),
                remaining: Some(0),
                reset: Some(1705315800),
            })
        );
    }

    #[test]
    fn test_retry_after_absent_is_none_not_zero() {
        let err = map_error(429, &body("SENS_429", "Rate limit exceeded"), &HeaderMap::new());
        assert_eq!(err.retry_after(), None);
        assert_eq!(err.rate_limit(), None);

        let err = map_error(503, b"", &HeaderMap::new());
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_service_unavailable_retry_after() {
        let err = map_error(503, b"{}", &headers(&[("retry-after", "120")]));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_http_date_retry_after_is_ignored() {
        let err = map_error(
            429,
            b"{}",
            &headers(&[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")]),
        );
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_retry_after_ignored_for_other_kinds() {
        let err = map_error(404, b"{}", &headers(&[("retry-after", "30")]));
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_non_json_body_falls_back_to_status() {
        let err = map_error(502, b"<html>Bad Gateway</html>", &HeaderMap::new());
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "HTTP 502");
        assert_eq!(err.code(), None);
        assert_eq!(err.details(), None);
    }

    #[test]
    fn test_missing_code_is_not_invented() {
        let err = map_error(404, br#"{"message": "Document not found"}"#, &HeaderMap::new());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Document not found");
    }

    fn response(status: u16, body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            headers: HeaderMap::new(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_decode_success() {
        let doc: sens_core::Document =
            decode(response(202, br#"{"id": "doc_1", "status": "processing"}"#)).unwrap();
        assert_eq!(doc.id, "doc_1");
    }

    #[test]
    fn test_decode_unparseable_success_is_generic() {
        let err = decode::<sens_core::Document>(response(200, b"not json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn test_expect_success() {
        assert!(expect_success(response(204, b"")).is_ok());
        let err = expect_success(response(404, br#"{"code": "SENS_404", "message": "gone"}"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), Some("SENS_404"));
    }
}

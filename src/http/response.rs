//! HTTP response building module
//!
//! Turns service responses into hyper responses with a JSON body.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};
use serde_json::Value;

use crate::error::ServiceError;
use crate::service::{error_response, ServiceResponse};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Build a JSON response
pub fn json_response(status: StatusCode, body: &Value, server_name: &str) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return build_fallback(StatusCode::INTERNAL_SERVER_ERROR, server_name);
        }
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .header(CONTENT_LENGTH, json.len())
        .header(SERVER, server_name)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            build_fallback(StatusCode::INTERNAL_SERVER_ERROR, server_name)
        })
}

/// Convert a service response
pub fn into_http(response: &ServiceResponse, server_name: &str) -> Response<Full<Bytes>> {
    json_response(response.status, &response.body, server_name)
}

/// Error response for a failure that happened outside a service
pub fn error_to_http(err: &ServiceError, server_name: &str) -> Response<Full<Bytes>> {
    into_http(&error_response(err), server_name)
}

const FALLBACK_BODY: &[u8] = br#"{"errors":[{"message":"Something went wrong"}]}"#;

/// Minimal response used when building the real one fails
///
/// The `Server` header is left out when `server_name` is not a valid value.
fn build_fallback(status: StatusCode, server_name: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(FALLBACK_BODY)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(FALLBACK_BODY.len()));
    if let Ok(value) = HeaderValue::from_str(server_name) {
        headers.insert(SERVER, value);
    }
    response
}

fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

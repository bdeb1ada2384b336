//! HTTP request reading module
//!
//! Converts a hyper request into a [`ServiceRequest`]: decodes the query
//! string and reads the body as JSON, enforcing the configured size limit.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::CONTENT_LENGTH;
use hyper::{HeaderMap, Request};
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};
use crate::request::{Query, ServiceRequest};

const TOO_LARGE: &str = "Request body too large";

/// Read `req` fully into a service request
pub async fn read_request<B>(req: Request<B>, max_body_size: u64) -> ServiceResult<ServiceRequest>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > max_body_size) {
        return Err(ServiceError::bad_request(TOO_LARGE));
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(ServiceError::bad_request(TOO_LARGE));
        }
        Err(e) => {
            return Err(ServiceError::Other(anyhow::anyhow!(
                "Failed to read request body: {e}"
            )));
        }
    };

    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|_| ServiceError::bad_request("Invalid JSON body"))?
    };

    Ok(ServiceRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(Query::parse).unwrap_or_default(),
        body,
        headers: parts.headers,
    })
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

//! Test harness
//!
//! Builds a hyper request from literal options, pushes it through the HTTP
//! adapter and hands back the status code with the parsed JSON body.
//!
//! ```ignore
//! let res = test_service(&service, RequestOptions::get("/items").query("filter", "one")).await?;
//! assert_eq!(res.status_code, 200);
//! ```

use anyhow::Context;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Request};
use serde_json::Value;

use crate::config::HttpConfig;
use crate::http::{serve, Router};
use crate::service::Service;

/// Literal description of a request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: "/".to_string(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a query pair; repeat a key to send several values
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send `value` as a JSON body
    #[must_use]
    pub fn json(mut self, value: &Value) -> Self {
        self.body = Some(Bytes::from(value.to_string()));
        self.header(CONTENT_TYPE.as_str(), "application/json")
    }

    /// Send raw bytes as the body
    #[must_use]
    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{encoded}", self.url)
    }

    /// Build the hyper request
    pub fn into_request(self) -> anyhow::Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder().method(self.method.clone()).uri(self.uri());
        for (name, value) in &self.headers {
            let name = HeaderName::try_from(name.as_str())
                .with_context(|| format!("invalid header name {name:?}"))?;
            let value = HeaderValue::try_from(value.as_str())
                .with_context(|| format!("invalid value for header {name}"))?;
            builder = builder.header(name, value);
        }
        builder
            .body(Full::new(self.body.unwrap_or_default()))
            .context("failed to build request")
    }
}

/// Status, headers and parsed body of a handled request
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status_code: u16,
    pub data: Value,
    pub headers: HeaderMap,
}

async fn collect(response: hyper::Response<Full<Bytes>>) -> anyhow::Result<TestResponse> {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.context("failed to read response body")?.to_bytes();
    let data = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response body is not JSON")?
    };
    Ok(TestResponse {
        status_code: parts.status.as_u16(),
        data,
        headers: parts.headers,
    })
}

/// Run `options` through `service` with the default HTTP settings
pub async fn test_service(service: &Service, options: RequestOptions) -> anyhow::Result<TestResponse> {
    let response = serve(service, options.into_request()?, &HttpConfig::default()).await;
    collect(response).await
}

/// Run `options` through `router`, routing by path
pub async fn test_router(router: &Router, options: RequestOptions) -> anyhow::Result<TestResponse> {
    collect(router.handle(options.into_request()?).await).await
}

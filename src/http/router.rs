//! Path routing module
//!
//! Maps request paths to mounted services. Paths match exactly, ignoring a
//! trailing slash.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use std::collections::HashMap;

use super::request::read_request;
use super::response::{error_to_http, into_http};
use crate::config::HttpConfig;
use crate::error::ServiceError;
use crate::logger;
use crate::service::Service;

/// Mounted services keyed by normalized path
#[derive(Debug, Clone)]
pub struct Router {
    routes: HashMap<String, Service>,
    server_name: String,
    max_body_size: u64,
}

impl Router {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            routes: HashMap::new(),
            server_name: config.server_name.clone(),
            max_body_size: config.max_body_size,
        }
    }

    /// Mount `service` at `path`, replacing any service already there
    pub fn route(mut self, path: &str, service: Service) -> Self {
        let path = normalize_path(path);
        logger::log_route(&path, &service.options().methods.available());
        if self.routes.insert(path.clone(), service).is_some() {
            logger::log_warning(&format!("Route {path} mounted twice, keeping the last one"));
        }
        self
    }

    pub fn service(&self, path: &str) -> Option<&Service> {
        self.routes.get(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch a request to the service mounted at its path
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let Some(service) = self.service(req.uri().path()) else {
            return error_to_http(&ServiceError::NotFound, &self.server_name);
        };

        match read_request(req, self.max_body_size).await {
            Ok(req) => into_http(&service.handle(req).await, &self.server_name),
            Err(err) => error_to_http(&err, &self.server_name),
        }
    }
}

/// Serve a single request with `service`, whatever its path
pub async fn serve<B>(service: &Service, req: Request<B>, config: &HttpConfig) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match read_request(req, config.max_body_size).await {
        Ok(req) => into_http(&service.handle(req).await, &config.server_name),
        Err(err) => error_to_http(&err, &config.server_name),
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

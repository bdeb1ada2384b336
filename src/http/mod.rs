//! HTTP adapter module
//!
//! Bridges hyper requests and responses to [`Service`](crate::service::Service):
//! reads JSON bodies and query strings, writes JSON responses and routes by path.

pub mod request;
pub mod response;
pub mod router;

pub use request::read_request;
pub use response::{error_to_http, into_http, json_response};
pub use router::{serve, Router};

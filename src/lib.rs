//! Declarative CRUD services over HTTP
//!
//! A [`Service`] is configured with up to six operations (`find`, `create`,
//! `get`, `update`, `patch`, `remove`), a primary-key rule and before/after
//! hooks. Requests are dispatched by HTTP verb and the presence of a primary
//! key in the query; failures become `{"errors": [...]}` JSON responses.

pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod logger;
pub mod memory;
pub mod methods;
pub mod operation;
pub mod pk;
pub mod request;
pub mod server;
pub mod service;
pub mod testing;
pub mod validation;

pub use error::{ErrorEntry, ServiceError, ServiceResult};
pub use hooks::{Hook, HookSet, ServiceHooks};
pub use methods::ServiceMethods;
pub use operation::Operation;
pub use pk::PkConfig;
pub use request::{Query, QueryValue, ServiceRequest};
pub use service::{Service, ServiceBuilder, ServiceResponse};

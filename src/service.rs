//! Service module
//!
//! A [`Service`] binds the six CRUD operations to the HTTP verbs of a single
//! route. Handling a request goes through these steps:
//!
//! 1. Resolve the primary key from the query
//! 2. Select the operation from the method and the key
//! 3. Run the before-hooks (`all`, then operation-specific)
//! 4. Invoke the operation
//! 5. Run the after-hooks (`all`, then operation-specific)
//! 6. Respond with 200 (201 for `create`)
//!
//! Any failure along the way is turned into an error response by
//! [`error_response`].

use hyper::StatusCode;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::hooks::{run_hooks, Hook, ServiceHooks};
use crate::logger;
use crate::methods::ServiceMethods;
use crate::operation::Operation;
use crate::pk::PkConfig;
use crate::request::{Method, Query, ServiceRequest};

/// Status and JSON body produced for a request
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ServiceResponse {
    pub const fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

/// Map a failure to its response
///
/// Unclassified failures are logged; the client only sees a generic message.
pub fn error_response(err: &ServiceError) -> ServiceResponse {
    if let ServiceError::Other(cause) = err {
        logger::log_error(&format!("Unhandled service error: {cause:#}"));
    }

    let body = serde_json::to_value(err.body()).unwrap_or(Value::Null);
    ServiceResponse::new(err.status_code(), body)
}

/// Pick the operation for `method`, given whether a primary key was found
///
/// Rows are tried in order; `find` and `create` only apply without a key.
pub fn select_operation(
    methods: &ServiceMethods,
    method: &Method,
    has_pk: bool,
) -> Option<Operation> {
    let candidates: [(Operation, Method); 6] = [
        (Operation::Get, Method::GET),
        (Operation::Update, Method::PUT),
        (Operation::Patch, Method::PATCH),
        (Operation::Remove, Method::DELETE),
        (Operation::Find, Method::GET),
        (Operation::Create, Method::POST),
    ];

    candidates
        .into_iter()
        .find(|(op, verb)| methods.has(*op) && op.needs_pk() == has_pk && verb == method)
        .map(|(op, _)| op)
}

/// Immutable route configuration
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub methods: ServiceMethods,
    pub pk: PkConfig,
    pub hooks: ServiceHooks,
}

/// A CRUD route handler; cheap to clone
#[derive(Debug, Clone)]
pub struct Service {
    options: Arc<ServiceOptions>,
}

impl Service {
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Operation that would serve `req`, if any
    pub fn route(&self, req: &ServiceRequest) -> ServiceResult<Option<Operation>> {
        let pk = self.options.pk.resolve(&req.query)?;
        Ok(select_operation(
            &self.options.methods,
            &req.method,
            pk.is_some(),
        ))
    }

    /// Handle a request; never fails, errors become error responses
    pub async fn handle(&self, req: ServiceRequest) -> ServiceResponse {
        match self.dispatch(req).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        }
    }

    async fn dispatch(&self, req: ServiceRequest) -> ServiceResult<ServiceResponse> {
        let options = &self.options;
        let pk = options.pk.resolve(&req.query)?;
        let op = select_operation(&options.methods, &req.method, pk.is_some())
            .ok_or(ServiceError::NotFound)?;

        let req = run_hooks(&options.hooks.before.for_operation(op), req).await?;
        let result = options.methods.call(op, pk, &req).await?;
        run_hooks(&options.hooks.after.for_operation(op), req).await?;

        Ok(ServiceResponse::new(op.success_status(), result))
    }
}

/// Fluent construction of a [`Service`]
#[derive(Debug, Default)]
pub struct ServiceBuilder {
    options: ServiceOptions,
}

impl ServiceBuilder {
    /// Replace the whole operation set
    #[must_use]
    pub fn methods(mut self, methods: ServiceMethods) -> Self {
        self.options.methods = methods;
        self
    }

    #[must_use]
    pub fn find<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.options.methods = self.options.methods.find(f);
        self
    }

    #[must_use]
    pub fn create<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.options.methods = self.options.methods.create(f);
        self
    }

    #[must_use]
    pub fn get<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.options.methods = self.options.methods.get(f);
        self
    }

    #[must_use]
    pub fn update<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String, Value, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.options.methods = self.options.methods.update(f);
        self
    }

    #[must_use]
    pub fn patch<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String, Value, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.options.methods = self.options.methods.patch(f);
        self
    }

    #[must_use]
    pub fn remove<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: serde::Serialize + 'static,
    {
        self.options.methods = self.options.methods.remove(f);
        self
    }

    #[must_use]
    pub fn pk(mut self, pk: PkConfig) -> Self {
        self.options.pk = pk;
        self
    }

    #[must_use]
    pub fn pk_name(mut self, name: impl Into<String>) -> Self {
        self.options.pk = self.options.pk.with_name(name);
        self
    }

    #[must_use]
    pub fn pk_cast<F>(mut self, cast: F) -> Self
    where
        F: Fn(String) -> ServiceResult<String> + Send + Sync + 'static,
    {
        self.options.pk = self.options.pk.with_cast(cast);
        self
    }

    #[must_use]
    pub fn before_all(mut self, hook: impl Hook + 'static) -> Self {
        self.options.hooks.before.push_all(hook);
        self
    }

    #[must_use]
    pub fn before(mut self, op: Operation, hook: impl Hook + 'static) -> Self {
        self.options.hooks.before.push(op, hook);
        self
    }

    #[must_use]
    pub fn after_all(mut self, hook: impl Hook + 'static) -> Self {
        self.options.hooks.after.push_all(hook);
        self
    }

    #[must_use]
    pub fn after(mut self, op: Operation, hook: impl Hook + 'static) -> Self {
        self.options.hooks.after.push(op, hook);
        self
    }

    pub fn build(self) -> Service {
        Service::new(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::check;
    use serde_json::json;
    use std::sync::Mutex;

    fn full_methods() -> ServiceMethods {
        ServiceMethods::new()
            .find(|_| async { Ok("find") })
            .create(|_| async { Ok("create") })
            .get(|_, _| async { Ok("get") })
            .update(|_, _, _| async { Ok("update") })
            .patch(|_, _, _| async { Ok("patch") })
            .remove(|_| async { Ok("remove") })
    }

    #[test]
    fn test_dispatch_table() {
        let methods = full_methods();
        let cases = [
            (Method::GET, true, Some(Operation::Get)),
            (Method::PUT, true, Some(Operation::Update)),
            (Method::PATCH, true, Some(Operation::Patch)),
            (Method::DELETE, true, Some(Operation::Remove)),
            (Method::GET, false, Some(Operation::Find)),
            (Method::POST, false, Some(Operation::Create)),
            (Method::POST, true, None),
            (Method::PUT, false, None),
            (Method::PATCH, false, None),
            (Method::DELETE, false, None),
            (Method::HEAD, false, None),
            (Method::OPTIONS, true, None),
        ];
        for (method, has_pk, expected) in cases {
            assert_eq!(
                select_operation(&methods, &method, has_pk),
                expected,
                "{method} pk={has_pk}"
            );
        }
    }

    #[test]
    fn test_get_with_pk_never_falls_back_to_find() {
        let methods = ServiceMethods::new().find(|_| async { Ok("find") });
        assert_eq!(select_operation(&methods, &Method::GET, true), None);
        assert_eq!(
            select_operation(&methods, &Method::GET, false),
            Some(Operation::Find)
        );
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let service = Service::builder().build();
        let response = service.handle(ServiceRequest::new(Method::GET)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, json!({ "errors": [{ "message": "Not Found" }] }));
    }

    #[tokio::test]
    async fn test_create_is_201_and_others_200() {
        let service = Service::builder().methods(full_methods()).build();

        let created = service.handle(ServiceRequest::new(Method::POST)).await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body, json!("create"));

        let with_pk = Query::parse("id=1");
        for (method, name) in [
            (Method::GET, "get"),
            (Method::PUT, "update"),
            (Method::PATCH, "patch"),
            (Method::DELETE, "remove"),
        ] {
            let response = service
                .handle(ServiceRequest::new(method).with_query(with_pk.clone()))
                .await;
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body, json!(name));
        }
    }

    #[tokio::test]
    async fn test_hook_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let record = |label: &'static str| {
            let log = Arc::clone(&log);
            check(move |_| {
                log.lock().unwrap().push(label);
                Ok(())
            })
        };
        let handler_log = Arc::clone(&log);

        let service = Service::builder()
            .get(move |pk, _| {
                handler_log.lock().unwrap().push("handler");
                async move { Ok(pk) }
            })
            .before(Operation::Get, record("before-get"))
            .before_all(record("before-all"))
            .after(Operation::Get, record("after-get"))
            .after_all(record("after-all"))
            .before(Operation::Find, record("before-find"))
            .build();

        let response = service
            .handle(ServiceRequest::new(Method::GET).with_query(Query::parse("id=9")))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before-all", "before-get", "handler", "after-all", "after-get"]
        );
    }

    #[tokio::test]
    async fn test_before_hook_failure_skips_handler_and_after_hooks() {
        let called = Arc::new(Mutex::new(Vec::new()));
        let handler_calls = Arc::clone(&called);
        let after_calls = Arc::clone(&called);

        let service = Service::builder()
            .before(Operation::Get, check(|_| Err(ServiceError::NotAuthorised)))
            .get(move |_, _| {
                handler_calls.lock().unwrap().push("handler");
                async { Ok(json!({ "hello": "there" })) }
            })
            .after_all(check(move |_| {
                after_calls.lock().unwrap().push("after");
                Ok(())
            }))
            .build();

        let response = service
            .handle(ServiceRequest::new(Method::GET).with_query(Query::parse("id=1")))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.body,
            json!({ "errors": [{ "message": "Not authorised" }] })
        );
        assert!(called.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_after_hook_failure_replaces_result() {
        let service = Service::builder()
            .create(|body| async move { Ok(body) })
            .after(
                Operation::Create,
                check(|_| Err(ServiceError::bad_request("Duplicate entry"))),
            )
            .build();

        let response = service
            .handle(ServiceRequest::new(Method::POST).with_body(json!({ "a": 1 })))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.body,
            json!({ "errors": [{ "message": "Duplicate entry" }] })
        );
    }

    #[tokio::test]
    async fn test_handler_sees_request_from_hooks() {
        let service = Service::builder()
            .find(|query: Query| async move { Ok(query) })
            .before_all(|mut req: ServiceRequest| async move {
                req.query.insert("owner", "me");
                Ok(req)
            })
            .build();

        let response = service
            .handle(ServiceRequest::new(Method::GET).with_query(Query::parse("filter=one")))
            .await;
        assert_eq!(response.body, json!({ "filter": "one", "owner": "me" }));
    }

    #[tokio::test]
    async fn test_untyped_failures_are_generic_500() {
        let service = Service::builder()
            .find(|_| async { Err::<Value, _>(anyhow::anyhow!("db exploded").into()) })
            .get(|_, _| async { Ok("unreachable") })
            .pk_cast(|_| Err(ServiceError::other(std::fmt::Error)))
            .build();

        for req in [
            ServiceRequest::new(Method::GET),
            ServiceRequest::new(Method::GET).with_query(Query::parse("id=1")),
        ] {
            let response = service.handle(req).await;
            assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                response.body,
                json!({ "errors": [{ "message": "Something went wrong" }] })
            );
        }
    }

    #[tokio::test]
    async fn test_typed_failure_from_handler() {
        let service = Service::builder()
            .remove(|_| async { Err::<Value, _>(ServiceError::NotFound) })
            .build();
        let response = service
            .handle(ServiceRequest::new(Method::DELETE).with_query(Query::parse("pk=gone")))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_route_reports_selection() {
        let service = Service::builder()
            .pk_name("animal")
            .get(|pk, _| async move { Ok(pk) })
            .build();
        let req = ServiceRequest::new(Method::GET).with_query(Query::parse("animal=dog"));
        assert_eq!(service.route(&req).unwrap(), Some(Operation::Get));
        let req = ServiceRequest::new(Method::GET).with_query(Query::parse("id=dog"));
        assert_eq!(service.route(&req).unwrap(), None);
    }
}

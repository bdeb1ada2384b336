//! Operation functions module
//!
//! Holds the caller-supplied CRUD functions of a service. Each function may
//! return any serializable value; results are converted to JSON once, here.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::operation::{BoxFuture, Operation};
use crate::request::{Query, ServiceRequest};

type OpFuture = BoxFuture<'static, ServiceResult<Value>>;

pub type FindFn = Arc<dyn Fn(Query) -> OpFuture + Send + Sync>;
pub type CreateFn = Arc<dyn Fn(Value) -> OpFuture + Send + Sync>;
pub type GetFn = Arc<dyn Fn(String, Query) -> OpFuture + Send + Sync>;
pub type UpdateFn = Arc<dyn Fn(String, Value, Query) -> OpFuture + Send + Sync>;
pub type RemoveFn = Arc<dyn Fn(String) -> OpFuture + Send + Sync>;

/// The set of operations a service exposes; every slot starts empty
#[derive(Clone, Default)]
pub struct ServiceMethods {
    find: Option<FindFn>,
    create: Option<CreateFn>,
    get: Option<GetFn>,
    update: Option<UpdateFn>,
    patch: Option<UpdateFn>,
    remove: Option<RemoveFn>,
}

fn to_json<T: Serialize>(value: T) -> ServiceResult<Value> {
    serde_json::to_value(value).map_err(ServiceError::other)
}

impl ServiceMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// `find(query)`: list records
    #[must_use]
    pub fn find<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.find = Some(Arc::new(move |query: Query| -> OpFuture {
            let fut = f(query);
            Box::pin(async move { to_json(fut.await?) })
        }));
        self
    }

    /// `create(body)`: insert a record
    #[must_use]
    pub fn create<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.create = Some(Arc::new(move |body: Value| -> OpFuture {
            let fut = f(body);
            Box::pin(async move { to_json(fut.await?) })
        }));
        self
    }

    /// `get(pk, query)`: fetch one record
    #[must_use]
    pub fn get<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.get = Some(Arc::new(move |pk: String, query: Query| -> OpFuture {
            let fut = f(pk, query);
            Box::pin(async move { to_json(fut.await?) })
        }));
        self
    }

    /// `update(pk, body, query)`: replace one record
    #[must_use]
    pub fn update<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String, Value, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.update = Some(Arc::new(move |pk: String, body: Value, query: Query| -> OpFuture {
            let fut = f(pk, body, query);
            Box::pin(async move { to_json(fut.await?) })
        }));
        self
    }

    /// `patch(pk, body, query)`: partially modify one record
    #[must_use]
    pub fn patch<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String, Value, Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.patch = Some(Arc::new(move |pk: String, body: Value, query: Query| -> OpFuture {
            let fut = f(pk, body, query);
            Box::pin(async move { to_json(fut.await?) })
        }));
        self
    }

    /// `remove(pk)`: delete one record
    #[must_use]
    pub fn remove<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        self.remove = Some(Arc::new(move |pk: String| -> OpFuture {
            let fut = f(pk);
            Box::pin(async move { to_json(fut.await?) })
        }));
        self
    }

    pub const fn has(&self, op: Operation) -> bool {
        match op {
            Operation::Find => self.find.is_some(),
            Operation::Create => self.create.is_some(),
            Operation::Get => self.get.is_some(),
            Operation::Update => self.update.is_some(),
            Operation::Patch => self.patch.is_some(),
            Operation::Remove => self.remove.is_some(),
        }
    }

    /// Operations present in this set
    pub fn available(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.has(*op))
            .collect()
    }

    /// Invoke `op` with arguments taken from `req`
    ///
    /// A missing operation, or a missing primary key for a single-record
    /// operation, is reported as `NotFound`.
    pub async fn call(
        &self,
        op: Operation,
        pk: Option<String>,
        req: &ServiceRequest,
    ) -> ServiceResult<Value> {
        match op {
            Operation::Find => {
                let f = self.find.as_ref().ok_or(ServiceError::NotFound)?;
                f(req.query.clone()).await
            }
            Operation::Create => {
                let f = self.create.as_ref().ok_or(ServiceError::NotFound)?;
                f(req.body.clone()).await
            }
            Operation::Get => {
                let f = self.get.as_ref().ok_or(ServiceError::NotFound)?;
                let pk = pk.ok_or(ServiceError::NotFound)?;
                f(pk, req.query.clone()).await
            }
            Operation::Update => {
                let f = self.update.as_ref().ok_or(ServiceError::NotFound)?;
                let pk = pk.ok_or(ServiceError::NotFound)?;
                f(pk, req.body.clone(), req.query.clone()).await
            }
            Operation::Patch => {
                let f = self.patch.as_ref().ok_or(ServiceError::NotFound)?;
                let pk = pk.ok_or(ServiceError::NotFound)?;
                f(pk, req.body.clone(), req.query.clone()).await
            }
            Operation::Remove => {
                let f = self.remove.as_ref().ok_or(ServiceError::NotFound)?;
                let pk = pk.ok_or(ServiceError::NotFound)?;
                f(pk).await
            }
        }
    }
}

impl fmt::Debug for ServiceMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceMethods")
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use serde_json::json;

    #[test]
    fn test_empty_set_has_nothing() {
        let methods = ServiceMethods::new();
        assert!(methods.available().is_empty());
    }

    #[tokio::test]
    async fn test_call_passes_arguments() {
        let methods = ServiceMethods::new()
            .update(|pk, body, query: Query| async move {
                Ok(json!({ "pk": pk, "body": body, "query": query }))
            });
        assert_eq!(methods.available(), vec![Operation::Update]);

        let req = ServiceRequest::new(Method::PUT)
            .with_query(Query::parse("id=7&v=2"))
            .with_body(json!({ "name": "rex" }));
        let result = methods
            .call(Operation::Update, Some("7".to_string()), &req)
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({ "pk": "7", "body": { "name": "rex" }, "query": { "id": "7", "v": "2" } })
        );
    }

    #[tokio::test]
    async fn test_missing_operation_is_not_found() {
        let methods = ServiceMethods::new().find(|_| async { Ok(vec!["one"]) });
        let req = ServiceRequest::new(Method::GET);
        let err = methods
            .call(Operation::Get, Some("1".to_string()), &req)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }
}

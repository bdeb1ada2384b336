//! Hook module
//!
//! Hooks are async callbacks that run before or after an operation. A hook
//! receives the request by value and hands back the request the next step
//! should see, so it may modify or replace it. Returning an error aborts the
//! remaining chain and the operation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::error::{ServiceError, ServiceResult};
use crate::logger;
use crate::operation::{BoxFuture, Operation};
use crate::request::ServiceRequest;
use crate::validation::{self, FieldValidator};

pub trait Hook: Send + Sync {
    fn run(&self, req: ServiceRequest) -> BoxFuture<'static, ServiceResult<ServiceRequest>>;
}

impl<F, Fut> Hook for F
where
    F: Fn(ServiceRequest) -> Fut + Send + Sync,
    Fut: Future<Output = ServiceResult<ServiceRequest>> + Send + 'static,
{
    fn run(&self, req: ServiceRequest) -> BoxFuture<'static, ServiceResult<ServiceRequest>> {
        Box::pin(self(req))
    }
}

pub type SharedHook = Arc<dyn Hook>;

/// Hooks of one phase (before or after), grouped by operation
///
/// `all` runs ahead of the operation-specific list.
#[derive(Clone, Default)]
pub struct HookSet {
    pub all: Vec<SharedHook>,
    pub find: Vec<SharedHook>,
    pub create: Vec<SharedHook>,
    pub get: Vec<SharedHook>,
    pub update: Vec<SharedHook>,
    pub patch: Vec<SharedHook>,
    pub remove: Vec<SharedHook>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, op: Operation) -> &[SharedHook] {
        match op {
            Operation::Find => &self.find,
            Operation::Create => &self.create,
            Operation::Get => &self.get,
            Operation::Update => &self.update,
            Operation::Patch => &self.patch,
            Operation::Remove => &self.remove,
        }
    }

    fn list_mut(&mut self, op: Operation) -> &mut Vec<SharedHook> {
        match op {
            Operation::Find => &mut self.find,
            Operation::Create => &mut self.create,
            Operation::Get => &mut self.get,
            Operation::Update => &mut self.update,
            Operation::Patch => &mut self.patch,
            Operation::Remove => &mut self.remove,
        }
    }

    pub fn push_all(&mut self, hook: impl Hook + 'static) {
        self.all.push(Arc::new(hook));
    }

    pub fn push(&mut self, op: Operation, hook: impl Hook + 'static) {
        self.list_mut(op).push(Arc::new(hook));
    }

    /// Effective chain for `op`: the `all` hooks, then the operation's own
    pub fn for_operation(&self, op: Operation) -> Vec<SharedHook> {
        self.all.iter().chain(self.list(op)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.all.len() + Operation::ALL.iter().map(|op| self.list(*op).len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("all", &self.all.len())
            .field("find", &self.find.len())
            .field("create", &self.create.len())
            .field("get", &self.get.len())
            .field("update", &self.update.len())
            .field("patch", &self.patch.len())
            .field("remove", &self.remove.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceHooks {
    pub before: HookSet,
    pub after: HookSet,
}

/// Run `hooks` one after another, threading the request through
pub async fn run_hooks(
    hooks: &[SharedHook],
    mut req: ServiceRequest,
) -> ServiceResult<ServiceRequest> {
    for hook in hooks {
        req = hook.run(req).await?;
    }
    Ok(req)
}

/// Hook from a synchronous check that leaves the request untouched
pub fn check<F>(f: F) -> impl Hook
where
    F: Fn(&ServiceRequest) -> ServiceResult<()> + Send + Sync + 'static,
{
    move |req: ServiceRequest| {
        let result = f(&req).map(|()| req);
        async move { result }
    }
}

/// Names of resources that have been connected successfully
///
/// Owned by the caller and shared between hooks; nothing here is global.
/// Each name has its own cell, so a slow connect only holds up callers
/// waiting on the same name.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    cells: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_connected(&self, name: &str) -> bool {
        self.cells
            .lock()
            .await
            .get(name)
            .is_some_and(|cell| cell.initialized())
    }

    /// Forget `name` so the next request connects again
    pub async fn reset(&self, name: &str) {
        self.cells.lock().await.remove(name);
    }

    async fn cell(&self, name: &str) -> Arc<OnceCell<()>> {
        let mut cells = self.cells.lock().await;
        Arc::clone(cells.entry(name.to_string()).or_default())
    }

    /// Run `connect` unless `name` is already connected
    ///
    /// Concurrent callers for one name wait for a single attempt; a failed
    /// attempt leaves `name` unrecorded.
    pub async fn ensure<F, Fut>(&self, name: &str, connect: F) -> ServiceResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let cell = self.cell(name).await;
        cell.get_or_try_init(|| async {
            connect().await.map_err(|e| {
                logger::log_error(&format!("Failed to connect '{name}': {e:#}"));
                ServiceError::DatabaseConnection
            })
        })
        .await?;
        Ok(())
    }
}

/// Hook that connects the named resource on first use
pub fn connect_to_database<F, Fut>(
    registry: Arc<ConnectionRegistry>,
    name: &str,
    connect: F,
) -> impl Hook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let name: Arc<str> = Arc::from(name);
    let connect = Arc::new(connect);
    move |req: ServiceRequest| {
        let registry = Arc::clone(&registry);
        let name = Arc::clone(&name);
        let connect = Arc::clone(&connect);
        async move {
            registry.ensure(&name, || (*connect)()).await?;
            Ok(req)
        }
    }
}

/// Hook that fails with `RequestValidation` listing every violated field
pub fn validate_request(validators: Vec<FieldValidator>) -> impl Hook {
    let validators = Arc::new(validators);
    move |req: ServiceRequest| {
        let violations = validation::collect_violations(&validators, &req);
        async move {
            if violations.is_empty() {
                Ok(req)
            } else {
                Err(ServiceError::RequestValidation(violations))
            }
        }
    }
}

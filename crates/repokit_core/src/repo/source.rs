//! Source provider contract and a closure-backed implementation.
//!
//! # Responsibility
//! - Define the seven optional operations a backing source may offer.
//! - Let ad-hoc sources be assembled from closures.
//!
//! # Invariants
//! - `capabilities()` lists exactly the operations a source implements; the
//!   repository never calls an undeclared operation.
//! - Sources exchange raw JSON only; typed mapping happens in the repository.

use crate::model::entity::RawMap;
use crate::repo::operation::Operation;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

/// Failure reported by a source. Passed to callers untouched.
pub type SourceError = Box<dyn Error + Send + Sync>;

/// Raw source output. `Ok(None)` means the source returned nothing.
pub type SourceResult = Result<Option<Value>, SourceError>;

/// Raised when an undeclared operation is invoked on a source directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedOperation(pub Operation);

impl Display for UnsupportedOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "source does not implement `{}`", self.0)
    }
}

impl Error for UnsupportedOperation {}

fn unsupported(operation: Operation) -> SourceResult {
    Err(Box::new(UnsupportedOperation(operation)))
}

/// Backing data source for one entity type.
#[async_trait]
pub trait Source<T: Send + 'static>: Send + Sync {
    /// Operations this source implements.
    fn capabilities(&self) -> Vec<Operation>;

    async fn get(&self, _id: Value) -> SourceResult {
        unsupported(Operation::Get)
    }

    async fn get_all(&self) -> SourceResult {
        unsupported(Operation::GetAll)
    }

    async fn query(&self, _args: Vec<Value>) -> SourceResult {
        unsupported(Operation::Query)
    }

    async fn add(&self, _slug: RawMap) -> SourceResult {
        unsupported(Operation::Add)
    }

    /// Receives the caller's item as-is; no input transforms run.
    async fn remove(&self, _item: T) -> SourceResult {
        unsupported(Operation::Remove)
    }

    async fn fetch(&self, _slug: RawMap) -> SourceResult {
        unsupported(Operation::Fetch)
    }

    async fn update(&self, _slug: RawMap) -> SourceResult {
        unsupported(Operation::Update)
    }
}

type Handler<A> = Box<dyn Fn(A) -> BoxFuture<'static, SourceResult> + Send + Sync>;
type NullaryHandler = Box<dyn Fn() -> BoxFuture<'static, SourceResult> + Send + Sync>;

fn handler<A, F, Fut>(f: F) -> Handler<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SourceResult> + Send + 'static,
{
    Box::new(move |arg: A| f(arg).boxed())
}

/// Source built from optional closures.
///
/// Every populated closure is one declared capability.
pub struct FnSource<T> {
    get: Option<Handler<Value>>,
    get_all: Option<NullaryHandler>,
    query: Option<Handler<Vec<Value>>>,
    add: Option<Handler<RawMap>>,
    remove: Option<Handler<T>>,
    fetch: Option<Handler<RawMap>>,
    update: Option<Handler<RawMap>>,
}

impl<T> Default for FnSource<T> {
    fn default() -> Self {
        Self {
            get: None,
            get_all: None,
            query: None,
            add: None,
            remove: None,
            fetch: None,
            update: None,
        }
    }
}

impl<T: Send + 'static> FnSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.get = Some(handler(f));
        self
    }

    pub fn on_get_all<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.get_all = Some(Box::new(move || f().boxed()));
        self
    }

    pub fn on_query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.query = Some(handler(f));
        self
    }

    pub fn on_add<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RawMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.add = Some(handler(f));
        self
    }

    pub fn on_remove<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.remove = Some(handler(f));
        self
    }

    pub fn on_fetch<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RawMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.fetch = Some(handler(f));
        self
    }

    pub fn on_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RawMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SourceResult> + Send + 'static,
    {
        self.update = Some(handler(f));
        self
    }
}

#[async_trait]
impl<T: Send + 'static> Source<T> for FnSource<T> {
    fn capabilities(&self) -> Vec<Operation> {
        let declared = [
            (Operation::Get, self.get.is_some()),
            (Operation::GetAll, self.get_all.is_some()),
            (Operation::Query, self.query.is_some()),
            (Operation::Add, self.add.is_some()),
            (Operation::Remove, self.remove.is_some()),
            (Operation::Fetch, self.fetch.is_some()),
            (Operation::Update, self.update.is_some()),
        ];
        declared
            .into_iter()
            .filter_map(|(operation, present)| present.then_some(operation))
            .collect()
    }

    async fn get(&self, id: Value) -> SourceResult {
        match self.get.as_ref() {
            Some(f) => f(id).await,
            None => unsupported(Operation::Get),
        }
    }

    async fn get_all(&self) -> SourceResult {
        match self.get_all.as_ref() {
            Some(f) => f().await,
            None => unsupported(Operation::GetAll),
        }
    }

    async fn query(&self, args: Vec<Value>) -> SourceResult {
        match self.query.as_ref() {
            Some(f) => f(args).await,
            None => unsupported(Operation::Query),
        }
    }

    async fn add(&self, slug: RawMap) -> SourceResult {
        match self.add.as_ref() {
            Some(f) => f(slug).await,
            None => unsupported(Operation::Add),
        }
    }

    async fn remove(&self, item: T) -> SourceResult {
        match self.remove.as_ref() {
            Some(f) => f(item).await,
            None => unsupported(Operation::Remove),
        }
    }

    async fn fetch(&self, slug: RawMap) -> SourceResult {
        match self.fetch.as_ref() {
            Some(f) => f(slug).await,
            None => unsupported(Operation::Fetch),
        }
    }

    async fn update(&self, slug: RawMap) -> SourceResult {
        match self.update.as_ref() {
            Some(f) => f(slug).await,
            None => unsupported(Operation::Update),
        }
    }
}

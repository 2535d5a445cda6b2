//! Async CRUD facade over sourced providers.
//!
//! # Responsibility
//! - Bind each canonical operation to at most one source.
//! - Run source output through the mapper so callers always get typed,
//!   arity-correct results.
//!
//! # Invariants
//! - An operation name is bound at most once for the repository lifetime.
//! - A rejected `source` call leaves the binding table unchanged.
//! - Unbound operations fail without touching any source.
//! - Source failures reach callers unchanged inside `RepoError::Source`.

use crate::mapper::pipeline::Mapper;
use crate::mapper::transform::Transform;
use crate::model::entity::{Entity, MapperError, RawMap};
use crate::repo::operation::Operation;
use crate::repo::source::{Source, SourceError, SourceResult};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// No source provides this operation.
    Unbound(Operation),
    /// The bound source failed.
    Source(SourceError),
    /// Source output could not be mapped to the entity.
    Mapping(MapperError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound(operation) => {
                write!(f, "no source provider for operation `{operation}`")
            }
            Self::Source(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unbound(_) => None,
            Self::Source(err) => Some(&**err),
            Self::Mapping(err) => Some(err),
        }
    }
}

impl From<SourceError> for RepoError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<MapperError> for RepoError {
    fn from(value: MapperError) -> Self {
        Self::Mapping(value)
    }
}

/// Configuration error raised while sourcing providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    DuplicateBinding(Operation),
}

impl Display for BindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateBinding(operation) => {
                write!(f, "attempted to source duplicate operation `{operation}`")
            }
        }
    }
}

impl Error for BindingError {}

/// Typed repository for one entity type.
pub struct Repository<T: Entity> {
    mapper: Mapper<T>,
    bindings: BTreeMap<Operation, Arc<dyn Source<T>>>,
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self {
            mapper: Mapper::new(),
            bindings: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Debug for Repository<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("mapper", &self.mapper)
            .field("bound", &self.bound_operations())
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transform to the internal mapper.
    pub fn use_transform(&mut self, transform: impl Transform<T> + 'static) -> &mut Self {
        self.mapper.use_transform(transform);
        self
    }

    /// Binds every operation `provider` declares.
    ///
    /// # Errors
    /// - Returns `BindingError::DuplicateBinding` when any declared operation
    ///   is already bound. Nothing is bound in that case.
    pub fn source(&mut self, provider: Arc<dyn Source<T>>) -> Result<&mut Self, BindingError> {
        let mut offered = provider.capabilities();
        offered.sort();
        offered.dedup();

        if let Some(taken) = offered
            .iter()
            .copied()
            .find(|operation| self.bindings.contains_key(operation))
        {
            error!(
                "event=source_bind module=repo status=error entity={} op={} error_code=duplicate_binding",
                entity_name::<T>(),
                taken
            );
            return Err(BindingError::DuplicateBinding(taken));
        }

        for operation in &offered {
            self.bindings.insert(*operation, Arc::clone(&provider));
        }

        info!(
            "event=source_bind module=repo status=ok entity={} ops={}",
            entity_name::<T>(),
            join_operations(&offered)
        );
        Ok(self)
    }

    pub fn is_bound(&self, operation: Operation) -> bool {
        self.bindings.contains_key(&operation)
    }

    /// Bound operations in canonical order.
    pub fn bound_operations(&self) -> Vec<Operation> {
        self.bindings.keys().copied().collect()
    }

    pub fn mapper(&self) -> &Mapper<T> {
        &self.mapper
    }

    /// Finds one item by id.
    pub async fn get(&self, id: impl Into<Value>) -> RepoResult<T> {
        let source = self.bound(Operation::Get)?;
        let output = finish_call(Operation::Get, source.get(id.into()).await)?;
        Ok(self.mapper.to_single(output, None)?)
    }

    /// Lists every item.
    pub async fn get_all(&self) -> RepoResult<Vec<T>> {
        let source = self.bound(Operation::GetAll)?;
        let output = finish_call(Operation::GetAll, source.get_all().await)?;
        Ok(self.mapper.to_many(output)?)
    }

    /// Forwards `args` to the source query.
    pub async fn query(&self, args: Vec<Value>) -> RepoResult<Vec<T>> {
        let source = self.bound(Operation::Query)?;
        let output = finish_call(Operation::Query, source.query(args).await)?;
        Ok(self.mapper.to_many(output)?)
    }

    /// Adds `item`; resolves to the stored form, or to what was sent when
    /// the source returns nothing.
    pub async fn add(&self, item: T) -> RepoResult<T> {
        let source = self.bound(Operation::Add)?;
        let slug = self.mapper.transform_input(&item, None)?;
        let output = finish_call(Operation::Add, source.add(slug.clone()).await)?;
        self.single_or_slug(output, slug, item)
    }

    /// Persists `item`'s state.
    pub async fn update(&self, item: T) -> RepoResult<T> {
        let source = self.bound(Operation::Update)?;
        let slug = self.mapper.transform_input(&item, None)?;
        let output = finish_call(Operation::Update, source.update(slug.clone()).await)?;
        self.single_or_slug(output, slug, item)
    }

    /// Repopulates `item` from its identity.
    pub async fn fetch(&self, item: T) -> RepoResult<T> {
        let source = self.bound(Operation::Fetch)?;
        let slug = self.mapper.transform_input(&item, None)?;
        let output = finish_call(Operation::Fetch, source.fetch(slug.clone()).await)?;
        self.single_or_slug(output, slug, item)
    }

    /// Removes `item`. The source receives it untransformed.
    pub async fn remove(&self, item: T) -> RepoResult<()> {
        let source = self.bound(Operation::Remove)?;
        finish_call(Operation::Remove, source.remove(item).await)?;
        Ok(())
    }

    fn bound(&self, operation: Operation) -> RepoResult<Arc<dyn Source<T>>> {
        match self.bindings.get(&operation) {
            Some(source) => {
                debug!(
                    "event=repo_call module=repo status=start entity={} op={}",
                    entity_name::<T>(),
                    operation
                );
                Ok(Arc::clone(source))
            }
            None => {
                warn!(
                    "event=repo_call module=repo status=error entity={} op={} error_code=unbound",
                    entity_name::<T>(),
                    operation
                );
                Err(RepoError::Unbound(operation))
            }
        }
    }

    // The original item is the hint so its identity survives the round trip.
    fn single_or_slug(&self, output: Option<Value>, slug: RawMap, item: T) -> RepoResult<T> {
        let output = output.or(Some(Value::Object(slug)));
        Ok(self.mapper.to_single(output, Some(item))?)
    }
}

fn finish_call(operation: Operation, result: SourceResult) -> RepoResult<Option<Value>> {
    match result {
        Ok(output) => {
            debug!(
                "event=repo_call module=repo status=ok op={} empty={}",
                operation,
                output.is_none()
            );
            Ok(output)
        }
        Err(err) => {
            warn!(
                "event=repo_call module=repo status=error op={} error_code=source_failed error={}",
                operation, err
            );
            Err(RepoError::Source(err))
        }
    }
}

fn entity_name<T>() -> &'static str {
    std::any::type_name::<T>()
}

fn join_operations(operations: &[Operation]) -> String {
    operations
        .iter()
        .map(|operation| operation.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

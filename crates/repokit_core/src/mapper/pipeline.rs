//! Ordered transform pipeline between raw payloads and typed instances.
//!
//! # Responsibility
//! - Turn raw source output into typed instances (`transform_output`).
//! - Turn typed instances into slugs for sources (`transform_input`).
//! - Normalize result arity to one item or a sequence.
//!
//! # Invariants
//! - Output direction runs transforms in registration order.
//! - Input direction runs transforms in reverse registration order.
//! - Raw keys left after the output transforms are copied onto the instance.
//! - `to_many` wraps absent and bare values before mapping, so `None` and
//!   `Null` both yield one empty instance.

use crate::mapper::transform::Transform;
use crate::model::entity::{raw_map, Entity, MapperResult, RawMap};
use log::trace;
use serde_json::Value;
use std::fmt::{Debug, Formatter};

/// Two-way mapper for one entity type.
pub struct Mapper<T> {
    transforms: Vec<Box<dyn Transform<T>>>,
}

impl<T> Default for Mapper<T> {
    fn default() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }
}

impl<T> Debug for Mapper<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("entity", &std::any::type_name::<T>())
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

impl<T: Entity> Mapper<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transform to the end of the pipeline.
    pub fn use_transform(&mut self, transform: impl Transform<T> + 'static) -> &mut Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Builds a typed instance from a raw payload.
    ///
    /// A present `hint` is reused as the working instance; otherwise a fresh
    /// `T::default()` is used. Absent and non-mapping payloads carry no keys.
    ///
    /// # Errors
    /// - Returns `MapperError::Coerce` when leftover raw keys do not fit `T`.
    pub fn transform_output(&self, raw: Option<Value>, hint: Option<T>) -> MapperResult<T> {
        let mut raw = raw_map(raw);
        let mut instance = hint.unwrap_or_default();

        for (step, transform) in self.transforms.iter().enumerate() {
            if let Some(replacement) = transform.apply_output(&mut raw, &mut instance) {
                trace!(
                    "event=transform_output module=mapper status=replaced entity={} step={}",
                    std::any::type_name::<T>(),
                    step
                );
                instance = replacement;
            }
        }

        instance.absorb(raw)?;
        Ok(instance)
    }

    /// Builds a slug for a source from a typed instance.
    ///
    /// Fields are copied into `slug_hint` (or a fresh map) before the
    /// transforms run in reverse order.
    ///
    /// # Errors
    /// - Returns `MapperError::NotARecord` when `T` does not enumerate as a map.
    pub fn transform_input(&self, instance: &T, slug_hint: Option<RawMap>) -> MapperResult<RawMap> {
        let mut slug = slug_hint.unwrap_or_default();
        slug.extend(instance.fields()?);

        for transform in self.transforms.iter().rev() {
            transform.apply_input(&mut slug, instance);
        }

        Ok(slug)
    }

    /// Normalizes any result to exactly one instance.
    ///
    /// A sequence is replaced by its first element, which may be absent.
    pub fn to_single(&self, thing: Option<Value>, hint: Option<T>) -> MapperResult<T> {
        let thing = match thing {
            Some(Value::Array(items)) => items.into_iter().next(),
            other => other,
        };

        self.transform_output(thing, hint)
    }

    /// Normalizes any result to a sequence of fresh instances.
    pub fn to_many(&self, things: Option<Value>) -> MapperResult<Vec<T>> {
        let things = match things {
            Some(Value::Array(items)) => items.into_iter().map(Some).collect(),
            other => vec![other],
        };

        things
            .into_iter()
            .map(|thing| self.transform_output(thing, None))
            .collect()
    }
}

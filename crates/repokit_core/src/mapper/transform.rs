//! Bidirectional transform steps.
//!
//! # Responsibility
//! - Define the two-direction `Transform` contract.
//! - Provide common reshaping steps (rename, string coercion, omission).
//!
//! # Invariants
//! - Output direction may mutate the raw payload and the instance, and may
//!   replace the instance outright.
//! - Input direction mutates the slug in place and never touches the instance.

use crate::model::entity::RawMap;
use serde_json::Value;

/// One step of a mapper pipeline.
///
/// Both directions default to no-ops so a step can implement only the side
/// it cares about.
pub trait Transform<T>: Send + Sync {
    /// Raw to instance. Returning `Some` substitutes the working instance
    /// for every later step and for the copy phase.
    fn apply_output(&self, _raw: &mut RawMap, _instance: &mut T) -> Option<T> {
        None
    }

    /// Instance to slug.
    fn apply_input(&self, _slug: &mut RawMap, _instance: &T) {}
}

type OutputFn<T> = Box<dyn Fn(&mut RawMap, &mut T) -> Option<T> + Send + Sync>;
type InputFn<T> = Box<dyn Fn(&mut RawMap, &T) + Send + Sync>;

/// Transform assembled from closures.
pub struct FnTransform<T> {
    output: Option<OutputFn<T>>,
    input: Option<InputFn<T>>,
}

impl<T> FnTransform<T> {
    pub fn new<O, I>(output: O, input: I) -> Self
    where
        O: Fn(&mut RawMap, &mut T) -> Option<T> + Send + Sync + 'static,
        I: Fn(&mut RawMap, &T) + Send + Sync + 'static,
    {
        Self {
            output: Some(Box::new(output)),
            input: Some(Box::new(input)),
        }
    }

    /// Output-direction only step.
    pub fn output<O>(output: O) -> Self
    where
        O: Fn(&mut RawMap, &mut T) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            output: Some(Box::new(output)),
            input: None,
        }
    }

    /// Input-direction only step.
    pub fn input<I>(input: I) -> Self
    where
        I: Fn(&mut RawMap, &T) + Send + Sync + 'static,
    {
        Self {
            output: None,
            input: Some(Box::new(input)),
        }
    }
}

impl<T> Transform<T> for FnTransform<T> {
    fn apply_output(&self, raw: &mut RawMap, instance: &mut T) -> Option<T> {
        self.output.as_ref().and_then(|f| f(raw, instance))
    }

    fn apply_input(&self, slug: &mut RawMap, instance: &T) {
        if let Some(f) = self.input.as_ref() {
            f(slug, instance);
        }
    }
}

/// Maps a wire key to an instance field and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    wire: String,
    field: String,
}

impl Rename {
    pub fn new(wire: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            wire: wire.into(),
            field: field.into(),
        }
    }
}

impl<T> Transform<T> for Rename {
    fn apply_output(&self, raw: &mut RawMap, _instance: &mut T) -> Option<T> {
        if let Some(value) = raw.shift_remove(&self.wire) {
            raw.insert(self.field.clone(), value);
        }
        None
    }

    fn apply_input(&self, slug: &mut RawMap, _instance: &T) {
        if let Some(value) = slug.shift_remove(&self.field) {
            slug.insert(self.wire.clone(), value);
        }
    }
}

/// Coerces one field to its string form in both directions.
///
/// Null and missing values are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stringify {
    field: String,
}

impl Stringify {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    fn coerce(&self, map: &mut RawMap) {
        if let Some(value) = map.get_mut(&self.field) {
            if let Some(text) = string_form(value) {
                *value = Value::String(text);
            }
        }
    }
}

impl<T> Transform<T> for Stringify {
    fn apply_output(&self, raw: &mut RawMap, _instance: &mut T) -> Option<T> {
        self.coerce(raw);
        None
    }

    fn apply_input(&self, slug: &mut RawMap, _instance: &T) {
        self.coerce(slug);
    }
}

/// Keeps a field off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Omit {
    field: String,
}

impl Omit {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl<T> Transform<T> for Omit {
    fn apply_input(&self, slug: &mut RawMap, _instance: &T) {
        slug.shift_remove(&self.field);
    }
}

fn string_form(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::String(_) => None,
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

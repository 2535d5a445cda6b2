//! Typed entity contract and raw payload shapes.
//!
//! # Responsibility
//! - Define how a typed instance enumerates its data fields.
//! - Define the catch-all merge of raw keys onto a typed instance.
//!
//! # Invariants
//! - `Default` is the fresh empty instance used whenever no hint is given.
//! - Only serialized data fields take part in field enumeration; skipped
//!   fields and methods never reach a slug.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Untyped ordered mapping produced by, or handed to, a source.
pub type RawMap = Map<String, Value>;

pub type MapperResult<T> = Result<T, MapperError>;

/// Errors raised while moving data between raw and typed form.
#[derive(Debug)]
pub enum MapperError {
    /// The entity did not serialize to a key/value record.
    NotARecord(&'static str),
    /// Merged raw fields could not be coerced into the entity type.
    Coerce(serde_json::Error),
}

impl Display for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotARecord(type_name) => {
                write!(f, "entity `{type_name}` does not serialize to a record")
            }
            Self::Coerce(err) => write!(f, "raw payload does not fit entity: {err}"),
        }
    }
}

impl Error for MapperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotARecord(_) => None,
            Self::Coerce(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(value: serde_json::Error) -> Self {
        Self::Coerce(value)
    }
}

/// A typed domain instance the mapper can build and take apart.
///
/// The provided methods go through serde, so most entities only need
/// `#[derive(Default, Serialize, Deserialize)]` and an empty impl block.
/// Entities with fields serde cannot round-trip should override both methods.
///
/// The default `absorb` rebuilds the instance from its serialized fields, so a
/// `#[serde(skip)]` field resets to its `Default` whenever raw keys are merged.
/// This includes the results of `Repository::add`, `update` and `fetch`.
/// Override `absorb` to keep such fields.
pub trait Entity: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Enumerates the data fields of this instance.
    fn fields(&self) -> MapperResult<RawMap> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(MapperError::NotARecord(std::any::type_name::<Self>())),
        }
    }

    /// Copies every raw key onto this instance, last write wins.
    fn absorb(&mut self, raw: RawMap) -> MapperResult<()> {
        if raw.is_empty() {
            return Ok(());
        }

        let mut fields = self.fields()?;
        fields.extend(raw);
        *self = serde_json::from_value(Value::Object(fields))?;
        Ok(())
    }
}

/// Schemaless entity that keeps every key it is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub RawMap);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Entity for Record {
    fn fields(&self) -> MapperResult<RawMap> {
        Ok(self.0.clone())
    }

    fn absorb(&mut self, raw: RawMap) -> MapperResult<()> {
        self.0.extend(raw);
        Ok(())
    }
}

impl From<RawMap> for Record {
    fn from(value: RawMap) -> Self {
        Self(value)
    }
}

/// Reads a raw payload as a mapping.
///
/// Absent, null and scalar payloads carry no keys and read as empty.
pub fn raw_map(value: Option<Value>) -> RawMap {
    match value {
        Some(Value::Object(map)) => map,
        _ => RawMap::new(),
    }
}

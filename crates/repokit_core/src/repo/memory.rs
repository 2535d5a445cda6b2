//! In-memory source keyed by one payload field.
//!
//! # Responsibility
//! - Provide a ready-made source implementing all seven operations.
//! - Store raw slugs exactly as the repository hands them over.
//!
//! # Invariants
//! - Records are keyed by the string form of their key field (`id` unless
//!   configured otherwise).
//! - `remove` reads the key from the instance-side field, which differs from
//!   the stored slug key when a transform renames it.
//! - `add` assigns a UUID v4 key when the slug carries none.
//! - `update` returns nothing, so callers observe the slug fallback.

use crate::model::entity::{Entity, RawMap};
use crate::repo::operation::Operation;
use crate::repo::source::{Source, SourceResult};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DEFAULT_KEY_FIELD: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemorySourceError {
    NotFound(String),
    MissingKey(String),
    InvalidQuery(String),
    Poisoned,
}

impl Display for MemorySourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "record not found: {key}"),
            Self::MissingKey(field) => write!(f, "record has no `{field}` value"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::Poisoned => write!(f, "memory source lock poisoned"),
        }
    }
}

impl Error for MemorySourceError {}

/// Source backed by an in-process ordered map.
pub struct MemorySource<T> {
    key_field: String,
    item_key_field: String,
    records: Mutex<BTreeMap<String, RawMap>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Default for MemorySource<T> {
    fn default() -> Self {
        Self::with_key_field(DEFAULT_KEY_FIELD)
    }
}

impl<T> MemorySource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys records by `key_field` instead of `id`.
    pub fn with_key_field(key_field: impl Into<String>) -> Self {
        let key_field = key_field.into();
        Self::with_key_fields(key_field.clone(), key_field)
    }

    /// Keys stored slugs by `wire` while `remove` reads the key from the
    /// entity field `field`.
    pub fn with_key_fields(wire: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            key_field: wire.into(),
            item_key_field: field.into(),
            records: Mutex::new(BTreeMap::new()),
            _entity: PhantomData,
        }
    }

    /// Seeds one raw record. Returns its key.
    pub fn insert(&self, record: RawMap) -> Result<String, MemorySourceError> {
        let key = self.key_of(&record)?;
        self.lock()?.insert(key.clone(), record);
        Ok(key)
    }

    pub fn len(&self) -> Result<usize, MemorySourceError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, MemorySourceError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, RawMap>>, MemorySourceError> {
        self.records.lock().map_err(|_| MemorySourceError::Poisoned)
    }

    fn key_of(&self, record: &RawMap) -> Result<String, MemorySourceError> {
        key_in(record, &self.key_field)
    }
}

#[async_trait]
impl<T: Entity> Source<T> for MemorySource<T> {
    fn capabilities(&self) -> Vec<Operation> {
        Operation::ALL.to_vec()
    }

    async fn get(&self, id: Value) -> SourceResult {
        let key = key_string(&id);
        let found = self.lock()?.get(&key).cloned();
        debug!(
            "event=memory_get module=memory status=ok found={}",
            found.is_some()
        );
        Ok(found.map(Value::Object))
    }

    async fn get_all(&self) -> SourceResult {
        let records = self.lock()?;
        Ok(Some(Value::Array(
            records.values().cloned().map(Value::Object).collect(),
        )))
    }

    async fn query(&self, args: Vec<Value>) -> SourceResult {
        let filter = match args.as_slice() {
            [] => RawMap::new(),
            [Value::Object(filter)] => filter.clone(),
            [_] => {
                return Err(Box::new(MemorySourceError::InvalidQuery(
                    "filter must be an object".to_string(),
                )))
            }
            _ => {
                return Err(Box::new(MemorySourceError::InvalidQuery(format!(
                    "expected at most one filter, got {}",
                    args.len()
                ))))
            }
        };

        let records = self.lock()?;
        let matched: Vec<Value> = records
            .values()
            .filter(|record| {
                filter
                    .iter()
                    .all(|(field, expected)| record.get(field) == Some(expected))
            })
            .cloned()
            .map(Value::Object)
            .collect();
        debug!(
            "event=memory_query module=memory status=ok matched={}",
            matched.len()
        );
        Ok(Some(Value::Array(matched)))
    }

    async fn add(&self, mut slug: RawMap) -> SourceResult {
        let key = match self.key_of(&slug) {
            Ok(key) => key,
            Err(MemorySourceError::MissingKey(_)) => {
                let generated = Uuid::new_v4().to_string();
                slug.insert(self.key_field.clone(), Value::String(generated.clone()));
                generated
            }
            Err(err) => return Err(Box::new(err)),
        };

        self.lock()?.insert(key, slug.clone());
        Ok(Some(Value::Object(slug)))
    }

    async fn remove(&self, item: T) -> SourceResult {
        let fields = item.fields()?;
        let key = key_in(&fields, &self.item_key_field)?;
        let removed = self.lock()?.remove(&key).is_some();
        debug!(
            "event=memory_remove module=memory status=ok removed={}",
            removed
        );
        Ok(None)
    }

    async fn fetch(&self, slug: RawMap) -> SourceResult {
        let key = self.key_of(&slug)?;
        match self.lock()?.get(&key) {
            Some(record) => Ok(Some(Value::Object(record.clone()))),
            None => Err(Box::new(MemorySourceError::NotFound(key))),
        }
    }

    async fn update(&self, slug: RawMap) -> SourceResult {
        let key = self.key_of(&slug)?;
        let mut records = self.lock()?;
        match records.get_mut(&key) {
            Some(record) => {
                *record = slug;
                Ok(None)
            }
            None => Err(Box::new(MemorySourceError::NotFound(key))),
        }
    }
}

fn key_in(record: &RawMap, field: &str) -> Result<String, MemorySourceError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(MemorySourceError::MissingKey(field.to_string())),
        Some(value) => Ok(key_string(value)),
    }
}

fn key_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySource, MemorySourceError};
    use crate::model::entity::{raw_map, Record};
    use crate::repo::source::Source;
    use serde_json::json;

    #[tokio::test]
    async fn add_generates_missing_key() {
        let source = MemorySource::<Record>::new();
        let out = source
            .add(raw_map(Some(json!({ "name": "bob" }))))
            .await
            .expect("add should succeed")
            .expect("add returns the stored record");
        let id = out["id"].as_str().expect("generated id is a string");
        assert_eq!(id.len(), 36);
        assert_eq!(source.len().expect("lock should be healthy"), 1);
    }

    #[tokio::test]
    async fn numeric_and_string_keys_address_same_record() {
        let source = MemorySource::<Record>::new();
        source
            .insert(raw_map(Some(json!({ "id": 7, "name": "bob" }))))
            .expect("seed should insert");

        let by_number = source.get(json!(7)).await.expect("get should succeed");
        let by_text = source.get(json!("7")).await.expect("get should succeed");
        assert_eq!(by_number, by_text);
        assert!(by_number.is_some());
    }

    #[tokio::test]
    async fn query_rejects_non_object_filter() {
        let source = MemorySource::<Record>::new();
        let err = source
            .query(vec![json!("name")])
            .await
            .expect_err("string filter must fail");
        let err = err
            .downcast_ref::<MemorySourceError>()
            .expect("error should be MemorySourceError");
        assert!(matches!(err, MemorySourceError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn update_unknown_key_is_not_found() {
        let source = MemorySource::<Record>::new();
        let err = source
            .update(raw_map(Some(json!({ "id": "missing" }))))
            .await
            .expect_err("unknown record must fail");
        assert_eq!(
            err.downcast_ref::<MemorySourceError>(),
            Some(&MemorySourceError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn remove_reads_instance_side_key() {
        let source = MemorySource::<Record>::with_key_fields("_id", "id");
        source
            .insert(raw_map(Some(json!({ "_id": "a1" }))))
            .expect("seed should insert");

        let mut item = Record::new();
        item.insert("id", "a1");
        source.remove(item).await.expect("remove should succeed");
        assert!(source.is_empty().expect("lock should be healthy"));
    }

    #[test]
    fn poisoned_lock_is_reported_by_len() {
        let source = MemorySource::<Record>::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = source.records.lock().expect("fresh lock");
            panic!("poison the store");
        }));
        assert_eq!(source.len(), Err(MemorySourceError::Poisoned));
        assert_eq!(source.is_empty(), Err(MemorySourceError::Poisoned));
    }

    #[test]
    fn insert_requires_key_field() {
        let source = MemorySource::<Record>::with_key_field("key");
        let err = source
            .insert(raw_map(Some(json!({ "id": 1 }))))
            .expect_err("record without `key` must fail");
        assert_eq!(err, MemorySourceError::MissingKey("key".to_string()));
    }
}

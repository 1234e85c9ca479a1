// src/store/collection.rs

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use super::index::{Index, IndexSpec, IndexValue, values_at};
use crate::{
    error::AppError,
    models,
    schema::{CollectionSchema, ID_FIELD},
};

/// How timestamps are stamped onto an incoming document.
#[derive(Debug, Clone)]
pub enum Stamp {
    /// Fill `createdAt`/`updatedAt` when absent.
    Insert,
    /// Keep the stored `createdAt`, refresh `updatedAt`.
    Replace { created_at: Option<Value> },
}

/// Documents of one collection with their validator and indexes.
#[derive(Debug)]
pub struct Collection {
    schema: &'static CollectionSchema,
    docs: BTreeMap<String, Value>,
    indexes: Vec<Index>,
}

impl Collection {
    pub fn new(schema: &'static CollectionSchema) -> Self {
        Self {
            schema,
            docs: BTreeMap::new(),
            indexes: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static CollectionSchema {
        self.schema
    }

    pub fn set_schema(&mut self, schema: &'static CollectionSchema) {
        self.schema = schema;
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.docs.get(id)
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Builds and attaches an index. Re-adding an identical index is a no-op.
    pub fn add_index(&mut self, spec: IndexSpec) -> Result<String, AppError> {
        let name = spec.name();
        if let Some(existing) = self.indexes.iter().find(|i| i.name == name) {
            if existing.spec == spec {
                return Ok(name);
            }
            return Err(AppError::Conflict(format!(
                "Index '{}' already exists with different options",
                name
            )));
        }
        if spec.is_text() && self.indexes.iter().any(|i| i.spec.is_text()) {
            return Err(AppError::Conflict(format!(
                "Collection '{}' already has a text index",
                self.schema.name
            )));
        }
        let index = Index::build(spec, &self.docs)?;
        self.indexes.push(index);
        Ok(name)
    }

    /// Assigns the id, stamps timestamps and runs both validation layers.
    pub fn prepare(
        &self,
        raw: Value,
        id: Option<&str>,
        stamp: Stamp,
        now: &str,
    ) -> Result<(String, Value), AppError> {
        let Value::Object(mut map) = raw else {
            return Err(AppError::ValidationFailed(vec![
                "document: expected object".to_string(),
            ]));
        };

        let id = match (id, map.get(ID_FIELD)) {
            (Some(id), _) => id.to_string(),
            (None, Some(Value::String(s))) => s.clone(),
            (None, Some(_)) => {
                return Err(AppError::ValidationFailed(vec![format!(
                    "{}: expected string",
                    ID_FIELD
                )]));
            }
            (None, None) => uuid::Uuid::new_v4().to_string(),
        };
        map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        stamp_timestamps(&mut map, stamp, now);

        let document = Value::Object(map);
        self.schema.validate(&document)?;
        let document = models::canonicalize_for(self.schema.name, document)?;
        Ok((id, document))
    }

    /// Checks id and unique-key conflicts of a batch, against stored documents
    /// and within the batch itself.
    pub fn check_insert(&self, batch: &[(String, Value)]) -> Result<(), AppError> {
        let mut ids = HashMap::new();
        for (pos, (id, _)) in batch.iter().enumerate() {
            if self.docs.contains_key(id) || ids.insert(id.as_str(), pos).is_some() {
                return Err(AppError::Conflict(format!("Duplicate document id '{}'", id)));
            }
        }

        for index in self.indexes.iter().filter(|i| i.spec.unique) {
            let mut seen: HashMap<Vec<IndexValue>, &str> = HashMap::new();
            for (id, doc) in batch {
                index.check_unique(id, doc)?;
                for key in index.keys_for(doc) {
                    if let Some(holder) = seen.get(&key) {
                        if *holder != id.as_str() {
                            return Err(index.duplicate_key(&key));
                        }
                    }
                    seen.insert(key, id.as_str());
                }
            }
        }
        Ok(())
    }

    pub fn check_replace(&self, id: &str, doc: &Value) -> Result<(), AppError> {
        for index in &self.indexes {
            index.check_unique(id, doc)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, id: String, doc: Value) {
        for index in &mut self.indexes {
            index.insert(&id, &doc);
        }
        self.docs.insert(id, doc);
    }

    pub fn replace(&mut self, id: &str, doc: Value) -> Option<Value> {
        let previous = self.remove(id);
        self.insert(id.to_string(), doc);
        previous
    }

    pub fn remove(&mut self, id: &str) -> Option<Value> {
        let doc = self.docs.remove(id)?;
        for index in &mut self.indexes {
            index.remove(id, &doc);
        }
        Some(doc)
    }

    /// Equality match on every `(path, value)` pair, answered from the index
    /// covering the longest key prefix when there is one.
    pub fn find(&self, filter: &[(String, IndexValue)]) -> (Vec<&Value>, Option<&str>) {
        let paths: Vec<&str> = filter.iter().map(|(p, _)| p.as_str()).collect();
        let best = self
            .indexes
            .iter()
            .map(|index| (index.prefix_coverage(&paths), index))
            .filter(|(coverage, _)| *coverage > 0)
            .max_by_key(|(coverage, _)| *coverage);

        let candidates: Vec<&Value> = match best {
            Some((coverage, index)) => {
                let prefix: Vec<IndexValue> = index.spec.keys[..coverage]
                    .iter()
                    .filter_map(|k| {
                        filter
                            .iter()
                            .find(|(p, _)| *p == k.path)
                            .map(|(_, v)| v.clone())
                    })
                    .collect();
                index
                    .lookup(&prefix)
                    .iter()
                    .filter_map(|id| self.docs.get(id))
                    .collect()
            }
            None => self.docs.values().collect(),
        };

        let matched = candidates
            .into_iter()
            .filter(|doc| filter.iter().all(|(path, value)| matches(doc, path, value)))
            .collect();
        (matched, best.map(|(_, index)| index.name.as_str()))
    }

    /// Documents in the order of the named index.
    pub fn scan(&self, index_name: &str) -> Result<Vec<&Value>, AppError> {
        let index = self.index(index_name)?;
        if index.spec.is_text() {
            return Err(AppError::BadRequest(format!(
                "Index '{}' is a text index and has no order",
                index_name
            )));
        }
        Ok(index
            .ordered_ids()
            .iter()
            .filter_map(|id| self.docs.get(id))
            .collect())
    }

    /// Full-text search over the collection's text index.
    pub fn search(&self, query: &str) -> Result<Vec<(usize, &Value)>, AppError> {
        let index = self
            .indexes
            .iter()
            .find(|i| i.spec.is_text())
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Collection '{}' has no text index",
                    self.schema.name
                ))
            })?;
        Ok(index
            .search(query)
            .into_iter()
            .filter_map(|(id, score)| self.docs.get(&id).map(|doc| (score, doc)))
            .collect())
    }

    fn index(&self, name: &str) -> Result<&Index, AppError> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Index '{}' not found", name)))
    }
}

fn stamp_timestamps(map: &mut Map<String, Value>, stamp: Stamp, now: &str) {
    let now = Value::String(now.to_string());
    match stamp {
        Stamp::Insert => {
            map.entry("createdAt").or_insert_with(|| now.clone());
            map.entry("updatedAt").or_insert(now);
        }
        Stamp::Replace { created_at } => {
            match created_at {
                Some(created_at) => {
                    map.insert("createdAt".to_string(), created_at);
                }
                None => {
                    map.entry("createdAt").or_insert_with(|| now.clone());
                }
            }
            map.insert("updatedAt".to_string(), now);
        }
    }
}

/// A missing field matches `null`; array fields match any of their elements.
fn matches(doc: &Value, path: &str, expected: &IndexValue) -> bool {
    let values = values_at(doc, path);
    if values.is_empty() {
        return *expected == IndexValue::Null;
    }
    values
        .into_iter()
        .any(|v| IndexValue::from_json(v) == *expected)
}

// src/store/index.rs

//! Secondary indexes over a collection.
//!
//! Ordered indexes map a key tuple to the set of document ids holding it.
//! Array values are indexed element by element (multikey), so a document
//! tagged `["java", "basics"]` is reachable under both tags. Text indexes keep
//! a posting list per lower-cased token.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Ascending,
    Descending,
    Text,
}

impl KeyKind {
    fn suffix(&self) -> &'static str {
        match self {
            KeyKind::Ascending => "1",
            KeyKind::Descending => "-1",
            KeyKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexKey {
    pub path: String,
    pub kind: KeyKind,
}

/// Definition of an index: ordered key paths and options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub keys: Vec<IndexKey>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(keys: &[(&str, KeyKind)]) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|(path, kind)| IndexKey {
                    path: path.to_string(),
                    kind: *kind,
                })
                .collect(),
            unique: false,
        }
    }

    pub fn ascending(path: &str) -> Self {
        Self::new(&[(path, KeyKind::Ascending)])
    }

    pub fn descending(path: &str) -> Self {
        Self::new(&[(path, KeyKind::Descending)])
    }

    /// Full-text index over the given string fields.
    pub fn text(paths: &[&str]) -> Self {
        let keys: Vec<(&str, KeyKind)> = paths.iter().map(|p| (*p, KeyKind::Text)).collect();
        Self::new(&keys)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Conventional name, e.g. `lessonId_1`, `createdAt_-1`, `name_text_description_text`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}_{}", k.path, k.kind.suffix()))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn is_text(&self) -> bool {
        self.keys.iter().any(|k| k.kind == KeyKind::Text)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.keys.is_empty() {
            return Err(AppError::BadRequest("An index needs at least one key".to_string()));
        }
        if self.is_text() {
            if self.keys.iter().any(|k| k.kind != KeyKind::Text) {
                return Err(AppError::BadRequest(
                    "Text keys cannot be mixed with ordered keys".to_string(),
                ));
            }
            if self.unique {
                return Err(AppError::BadRequest("A text index cannot be unique".to_string()));
            }
        }
        Ok(())
    }
}

/// A single component of an index key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum IndexValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Strings, and non-integral numbers in their textual form.
    Str(String),
}

impl IndexValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => IndexValue::Null,
            Value::Bool(b) => IndexValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => IndexValue::Int(i),
                None => IndexValue::Str(n.to_string()),
            },
            Value::String(s) => IndexValue::Str(s.clone()),
            other => IndexValue::Str(other.to_string()),
        }
    }
}

/// Values reachable at a dotted path. Arrays along the way are expanded.
pub fn values_at<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = item.get(segment) {
                            next.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

/// Index key components for one path; missing fields index as null.
fn key_parts(doc: &Value, path: &str) -> Vec<IndexValue> {
    let mut parts: Vec<IndexValue> = values_at(doc, path).into_iter().map(IndexValue::from_json).collect();
    if parts.is_empty() {
        parts.push(IndexValue::Null);
    }
    parts.sort();
    parts.dedup();
    parts
}

/// Lower-cased alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[derive(Debug)]
enum IndexState {
    Ordered(BTreeMap<Vec<IndexValue>, BTreeSet<String>>),
    /// token -> document id -> occurrences
    Text(HashMap<String, HashMap<String, usize>>),
}

#[derive(Debug)]
pub struct Index {
    pub spec: IndexSpec,
    pub name: String,
    state: IndexState,
}

impl Index {
    /// Builds the index over existing documents.
    pub fn build(spec: IndexSpec, docs: &BTreeMap<String, Value>) -> Result<Self, AppError> {
        spec.check()?;
        let state = if spec.is_text() {
            IndexState::Text(HashMap::new())
        } else {
            IndexState::Ordered(BTreeMap::new())
        };
        let mut index = Self {
            name: spec.name(),
            spec,
            state,
        };
        for (id, doc) in docs {
            index.check_unique(id, doc)?;
            index.insert(id, doc);
        }
        Ok(index)
    }

    /// Every key tuple the document produces (cartesian product over multikey paths).
    pub fn keys_for(&self, doc: &Value) -> Vec<Vec<IndexValue>> {
        keys_for_spec(&self.spec, doc)
    }

    /// Fails when a unique key of `doc` is already held by another document.
    pub fn check_unique(&self, id: &str, doc: &Value) -> Result<(), AppError> {
        let IndexState::Ordered(entries) = &self.state else {
            return Ok(());
        };
        if !self.spec.unique {
            return Ok(());
        }
        for key in self.keys_for(doc) {
            if let Some(holders) = entries.get(&key) {
                if holders.iter().any(|holder| holder != id) {
                    return Err(self.duplicate_key(&key));
                }
            }
        }
        Ok(())
    }

    pub fn duplicate_key(&self, key: &[IndexValue]) -> AppError {
        AppError::Conflict(format!(
            "Duplicate key for unique index '{}': {}",
            self.name,
            serde_json::to_string(key).unwrap_or_default()
        ))
    }

    pub fn insert(&mut self, id: &str, doc: &Value) {
        match &mut self.state {
            IndexState::Ordered(entries) => {
                let keys = keys_for_spec(&self.spec, doc);
                for key in keys {
                    entries.entry(key).or_default().insert(id.to_string());
                }
            }
            IndexState::Text(postings) => {
                for token in text_tokens(&self.spec, doc) {
                    *postings
                        .entry(token)
                        .or_default()
                        .entry(id.to_string())
                        .or_default() += 1;
                }
            }
        }
    }

    pub fn remove(&mut self, id: &str, doc: &Value) {
        match &mut self.state {
            IndexState::Ordered(entries) => {
                for key in keys_for_spec(&self.spec, doc) {
                    if let Some(holders) = entries.get_mut(&key) {
                        holders.remove(id);
                        if holders.is_empty() {
                            entries.remove(&key);
                        }
                    }
                }
            }
            IndexState::Text(postings) => {
                for token in text_tokens(&self.spec, doc) {
                    if let Some(docs) = postings.get_mut(&token) {
                        docs.remove(id);
                        if docs.is_empty() {
                            postings.remove(&token);
                        }
                    }
                }
            }
        }
    }

    /// Ids whose key starts with `prefix`, in key order.
    pub fn lookup(&self, prefix: &[IndexValue]) -> Vec<String> {
        let IndexState::Ordered(entries) = &self.state else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }

    /// All ids in index order. The direction of the first key decides the order.
    pub fn ordered_ids(&self) -> Vec<String> {
        let IndexState::Ordered(entries) = &self.state else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        let ids: Vec<&String> = if self.spec.keys[0].kind == KeyKind::Descending {
            entries.values().rev().flat_map(|ids| ids.iter()).collect()
        } else {
            entries.values().flat_map(|ids| ids.iter()).collect()
        };
        ids.into_iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }

    /// Documents containing any term of `query`, best score first.
    pub fn search(&self, query: &str) -> Vec<(String, usize)> {
        let IndexState::Text(postings) = &self.state else {
            return Vec::new();
        };
        let mut scores: HashMap<&str, usize> = HashMap::new();
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();
        for term in &terms {
            if let Some(docs) = postings.get(term) {
                for (id, count) in docs {
                    *scores.entry(id.as_str()).or_default() += count;
                }
            }
        }
        let mut hits: Vec<(String, usize)> = scores
            .into_iter()
            .map(|(id, score)| (id.to_string(), score))
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hits
    }

    /// Leading key paths this index can answer from `paths`.
    pub fn prefix_coverage(&self, paths: &[&str]) -> usize {
        if self.spec.is_text() {
            return 0;
        }
        self.spec
            .keys
            .iter()
            .take_while(|k| paths.contains(&k.path.as_str()))
            .count()
    }
}

fn keys_for_spec(spec: &IndexSpec, doc: &Value) -> Vec<Vec<IndexValue>> {
    let mut keys: Vec<Vec<IndexValue>> = vec![Vec::new()];
    for key in &spec.keys {
        let parts = key_parts(doc, &key.path);
        let mut next = Vec::with_capacity(keys.len() * parts.len());
        for prefix in &keys {
            for part in &parts {
                let mut k = prefix.clone();
                k.push(part.clone());
                next.push(k);
            }
        }
        keys = next;
    }
    keys
}

fn text_tokens(spec: &IndexSpec, doc: &Value) -> Vec<String> {
    spec.keys
        .iter()
        .flat_map(|key| values_at(doc, &key.path))
        .filter_map(Value::as_str)
        .flat_map(tokenize)
        .collect()
}

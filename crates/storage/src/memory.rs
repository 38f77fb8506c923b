//! In-memory storage implementation
//!
//! Documents live in a mutex-guarded vector; nothing survives the process.

use async_trait::async_trait;
use docpref_core::{
    Filter, IndexOptions, PrefDocument, PrefError, Result, UpdateOptions, KEY_FIELD, VALUE_FIELD,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::trait_::{
    validate_collection_name, DocumentCollection, DocumentDatabase, SharedCollection,
};

#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<PrefDocument>,
    /// Indexed field -> unique flag
    indexes: HashMap<String, bool>,
}

impl CollectionState {
    /// Fail if any unique index is violated by the current documents
    fn check_unique(&self) -> Result<()> {
        for (field, unique) in &self.indexes {
            if !unique {
                continue;
            }
            let mut seen = HashSet::new();
            for doc in &self.documents {
                let projected = project(doc, field)?;
                if !seen.insert(projected) {
                    return Err(PrefError::UniqueViolation {
                        field: field.clone(),
                        key: doc.key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fail if writing `document` over the `replaced` positions would break
    /// a unique index. Only the incoming document is compared.
    fn check_write(&self, document: &PrefDocument, replaced: &[usize]) -> Result<()> {
        for (field, unique) in &self.indexes {
            if !unique {
                continue;
            }
            let violation = || PrefError::UniqueViolation {
                field: field.clone(),
                key: document.key.clone(),
            };
            if replaced.len() > 1 {
                return Err(violation());
            }

            let incoming = project(document, field)?;
            for (i, doc) in self.documents.iter().enumerate() {
                if replaced.contains(&i) {
                    continue;
                }
                let clash = match field.as_str() {
                    KEY_FIELD => doc.key == incoming,
                    _ => project(doc, field)? == incoming,
                };
                if clash {
                    return Err(violation());
                }
            }
        }
        Ok(())
    }
}

/// Field value used for index comparisons
fn project(doc: &PrefDocument, field: &str) -> Result<String> {
    match field {
        KEY_FIELD => Ok(doc.key.clone()),
        VALUE_FIELD => Ok(serde_json::to_string(&doc.value)?),
        other => Err(PrefError::Storage(format!("unknown field: {other}"))),
    }
}

fn check_field(field: &str) -> Result<()> {
    match field {
        KEY_FIELD | VALUE_FIELD => Ok(()),
        other => Err(PrefError::Storage(format!("unknown field: {other}"))),
    }
}

/// In-memory document collection
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    state: Mutex<CollectionState>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(CollectionState::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CollectionState>> {
        self.state.lock().map_err(|e| PrefError::Storage(e.to_string()))
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn has_index(&self, field: &str) -> Result<bool> {
        Ok(self.lock()?.indexes.contains_key(field))
    }

    async fn create_index(&self, field: &str, options: IndexOptions) -> Result<()> {
        check_field(field)?;
        let mut state = self.lock()?;
        let previous = state.indexes.insert(field.to_string(), options.unique);
        if let Err(e) = state.check_unique() {
            match previous {
                Some(unique) => state.indexes.insert(field.to_string(), unique),
                None => state.indexes.remove(field),
            };
            return Err(e);
        }
        debug!("Created index on {}.{} (unique: {})", self.name, field, options.unique);
        Ok(())
    }

    async fn drop_index(&self, field: &str) -> Result<()> {
        self.lock()?
            .indexes
            .remove(field)
            .map(|_| ())
            .ok_or_else(|| PrefError::IndexMissing(field.to_string()))
    }

    async fn find(&self, filter: &Filter, limit: Option<usize>) -> Result<Vec<PrefDocument>> {
        let state = self.lock()?;
        let matching = state.documents.iter().filter(|doc| filter.matches(doc));
        Ok(match limit {
            Some(n) => matching.take(n).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }

    async fn update(
        &self,
        filter: &Filter,
        document: PrefDocument,
        options: UpdateOptions,
    ) -> Result<usize> {
        let mut state = self.lock()?;
        let matched: Vec<usize> = state
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(i, _)| i)
            .collect();
        if matched.is_empty() && !options.upsert {
            return Ok(0);
        }

        state.check_write(&document, &matched)?;

        if matched.is_empty() {
            state.documents.push(document);
            return Ok(1);
        }
        for &i in &matched {
            state.documents[i] = document.clone();
        }
        Ok(matched.len())
    }

    async fn remove(&self, filter: &Filter) -> Result<usize> {
        let mut state = self.lock()?;
        let before = state.documents.len();
        state.documents.retain(|doc| !filter.matches(doc));
        Ok(before - state.documents.len())
    }
}

/// In-memory database of named collections
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    collections: Mutex<BTreeMap<String, Arc<MemoryCollection>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentDatabase for MemoryDatabase {
    async fn collection(&self, name: &str) -> Result<SharedCollection> {
        validate_collection_name(name)?;
        let mut collections = self
            .collections
            .lock()
            .map_err(|e| PrefError::Storage(e.to_string()))?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone();
        Ok(collection)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let collections = self
            .collections
            .lock()
            .map_err(|e| PrefError::Storage(e.to_string()))?;
        Ok(collections.keys().cloned().collect())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .lock()
            .map_err(|e| PrefError::Storage(e.to_string()))?
            .remove(name);
        Ok(())
    }
}

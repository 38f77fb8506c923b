//! PrefEditor - batched preference writes
//!
//! Changes accumulate in memory until `commit` (awaited, reports success) or
//! `apply` (spawned on the store's runtime, result discarded).

use docpref_core::{Filter, PrefDocument, PrefValue, Result, UpdateOptions};
use docpref_storage::DocumentCollection;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::pref::PrefInner;

/// Pending changes of one editor
#[derive(Debug, Clone, Default)]
struct PendingChanges {
    clear: bool,
    to_remove: BTreeSet<String>,
    /// `None` removes the key on commit
    to_apply: BTreeMap<String, Option<PrefValue>>,
}

impl PendingChanges {
    /// Clear-all, then per-key removals, then per-key upserts
    async fn write_to(&self, collection: &dyn DocumentCollection) -> Result<()> {
        if self.clear {
            collection.remove(&Filter::All).await?;
        } else {
            for key in &self.to_remove {
                collection.remove(&Filter::key(key)).await?;
            }
        }

        for (key, value) in &self.to_apply {
            match value {
                None => {
                    collection.remove(&Filter::key(key)).await?;
                }
                Some(value) => {
                    collection
                        .update(
                            &Filter::key(key),
                            PrefDocument::new(key.clone(), value.clone()),
                            UpdateOptions::upsert(),
                        )
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Keys to report to listeners, `None` standing for "everything cleared"
    fn changed_keys(&self) -> Vec<Option<String>> {
        let mut keys = Vec::new();
        if self.clear {
            keys.push(None);
        }
        let touched: BTreeSet<&String> = if self.clear {
            self.to_apply.keys().collect()
        } else {
            self.to_remove.iter().chain(self.to_apply.keys()).collect()
        };
        keys.extend(touched.into_iter().map(|k| Some(k.clone())));
        keys
    }
}

async fn try_commit_pending(inner: &PrefInner, pending: &PendingChanges) -> Result<()> {
    pending.write_to(inner.collection.as_ref()).await?;
    debug!(
        "Committed {} assignments, {} removals (clear: {}) to {}",
        pending.to_apply.len(),
        pending.to_remove.len(),
        pending.clear,
        inner.collection.name()
    );
    inner.notify(&pending.changed_keys());
    Ok(())
}

async fn commit_pending(inner: &PrefInner, pending: &PendingChanges) -> bool {
    match try_commit_pending(inner, pending).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to commit preferences to {}: {}", inner.collection.name(), e);
            false
        }
    }
}

/// Accumulates writes for a `DbPref`
pub struct PrefEditor {
    inner: Arc<PrefInner>,
    pending: PendingChanges,
}

impl std::fmt::Debug for PrefEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefEditor")
            .field("collection", &self.inner.collection.name())
            .field("pending", &self.pending)
            .finish()
    }
}

impl PrefEditor {
    pub(crate) fn new(inner: Arc<PrefInner>) -> Self {
        Self {
            inner,
            pending: PendingChanges::default(),
        }
    }

    /// Mark every existing record for removal. Assignments made through this
    /// editor are still written after the clear.
    pub fn clear(&mut self) -> &mut Self {
        self.pending.clear = true;
        self
    }

    /// Assign any value
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<PrefValue>) -> &mut Self {
        self.pending.to_apply.insert(key.into(), Some(value.into()));
        self
    }

    /// Assign a value, or remove the key when `value` is `None`
    pub fn put_optional(&mut self, key: impl Into<String>, value: Option<PrefValue>) -> &mut Self {
        self.pending.to_apply.insert(key.into(), value);
        self
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.put(key, value)
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i32) -> &mut Self {
        self.put(key, value)
    }

    pub fn put_long(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.put(key, value)
    }

    pub fn put_float(&mut self, key: impl Into<String>, value: f32) -> &mut Self {
        self.put(key, value)
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.put(key, PrefValue::String(value.into()))
    }

    pub fn put_string_set<I, S>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        self.put(key, set)
    }

    /// Drop any pending assignment for `key` and remove it on commit
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.pending.to_apply.remove(&key);
        self.pending.to_remove.insert(key);
        self
    }

    /// True when nothing has been queued
    pub fn is_empty(&self) -> bool {
        !self.pending.clear && self.pending.to_remove.is_empty() && self.pending.to_apply.is_empty()
    }

    /// Write pending changes, propagating the first storage error.
    ///
    /// Pending changes are kept, so the editor may be committed again.
    pub async fn try_commit(&self) -> Result<()> {
        try_commit_pending(&self.inner, &self.pending).await
    }

    /// Write pending changes; failures are logged and reported as `false`
    pub async fn commit(&self) -> bool {
        commit_pending(&self.inner, &self.pending).await
    }

    /// Commit on the store's runtime without waiting.
    ///
    /// Dropping the returned handle detaches the task. Overlapping applies
    /// are not ordered against each other.
    pub fn apply(&self) -> JoinHandle<bool> {
        let inner = self.inner.clone();
        let pending = self.pending.clone();
        self.inner
            .runtime
            .spawn(async move { commit_pending(&inner, &pending).await })
    }
}

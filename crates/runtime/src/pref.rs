//! DbPref - preference store backed by a document collection
//!
//! Reads are point lookups by key. Missing keys, storage failures and type
//! mismatches all resolve to the caller's default.

use docpref_core::{
    Filter, FromPrefValue, IndexOptions, PrefError, PrefValue, Result, RuntimeConfig, KEY_FIELD,
};
use docpref_storage::{DocumentCollection, SharedCollection};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::editor::PrefEditor;
use crate::listener::PrefChangeListener;

pub(crate) struct PrefInner {
    pub(crate) collection: SharedCollection,
    pub(crate) listeners: Mutex<Vec<Arc<dyn PrefChangeListener>>>,
    /// Background execution context for `apply`
    pub(crate) runtime: Handle,
    pub(crate) config: RuntimeConfig,
}

impl PrefInner {
    pub(crate) fn notify(&self, keys: &[Option<String>]) {
        if !self.config.notify_listeners || keys.is_empty() {
            return;
        }
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners.clone(),
            Err(e) => {
                warn!("Listener registry poisoned: {}", e);
                return;
            }
        };
        for listener in &listeners {
            for key in keys {
                listener.on_pref_changed(key.as_deref());
            }
        }
    }
}

/// Preference store
#[derive(Clone)]
pub struct DbPref {
    pub(crate) inner: Arc<PrefInner>,
}

impl std::fmt::Debug for DbPref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbPref")
            .field("collection", &self.inner.collection.name())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl DbPref {
    /// Wrap a collection, ensuring a unique index on `key`.
    ///
    /// Must be called inside a Tokio runtime; that runtime runs `apply`.
    pub async fn new(collection: SharedCollection) -> Result<Self> {
        Self::with_config(collection, RuntimeConfig::default()).await
    }

    pub async fn with_config(collection: SharedCollection, config: RuntimeConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| PrefError::Runtime(e.to_string()))?;

        if !collection.has_index(KEY_FIELD).await? {
            collection
                .create_index(KEY_FIELD, IndexOptions::unique())
                .await?;
            info!("Created unique key index on collection {}", collection.name());
        }

        Ok(Self {
            inner: Arc::new(PrefInner {
                collection,
                listeners: Mutex::new(Vec::new()),
                runtime,
                config,
            }),
        })
    }

    /// Name of the underlying collection
    pub fn name(&self) -> &str {
        self.inner.collection.name()
    }

    /// True when the collection holds no documents
    pub async fn is_empty(&self) -> Result<bool> {
        let first = self.inner.collection.find(&Filter::All, Some(1)).await?;
        Ok(first.is_empty())
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        let found = self.inner.collection.find(&Filter::key(key), Some(1)).await?;
        Ok(!found.is_empty())
    }

    /// Raw stored value for `key`, if any
    pub async fn get_value(&self, key: &str) -> Result<Option<PrefValue>> {
        let found = self.inner.collection.find(&Filter::key(key), Some(1)).await?;
        Ok(found.into_iter().next().map(|doc| doc.value))
    }

    async fn lookup<T: FromPrefValue>(&self, key: &str) -> Option<T> {
        match self.get_value(key).await {
            Ok(value) => value.and_then(|v| v.get::<T>()),
            Err(e) => {
                warn!("Failed to read preference {}: {}", key, e);
                None
            }
        }
    }

    /// Typed read; absence or a type mismatch returns `default`
    pub async fn get<T: FromPrefValue>(&self, key: &str, default: T) -> T {
        self.lookup(key).await.unwrap_or(default)
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key, default).await
    }

    pub async fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key, default).await
    }

    pub async fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get(key, default).await
    }

    pub async fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get(key, default).await
    }

    pub async fn get_string(&self, key: &str, default: Option<String>) -> Option<String> {
        self.lookup(key).await.or(default)
    }

    pub async fn get_string_set(
        &self,
        key: &str,
        default: Option<BTreeSet<String>>,
    ) -> Option<BTreeSet<String>> {
        self.lookup(key).await.or(default)
    }

    /// Every stored key and value
    pub async fn get_all(&self) -> Result<HashMap<String, PrefValue>> {
        let documents = self.inner.collection.find(&Filter::All, None).await?;
        Ok(documents
            .into_iter()
            .map(|doc| (doc.key, doc.value))
            .collect())
    }

    /// Register a listener; registering the same listener twice has no effect
    pub fn register_listener(&self, listener: Arc<dyn PrefChangeListener>) {
        match self.inner.listeners.lock() {
            Ok(mut listeners) => {
                if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
                    listeners.push(listener);
                }
            }
            Err(e) => warn!("Listener registry poisoned: {}", e),
        }
    }

    pub fn unregister_listener(&self, listener: &Arc<dyn PrefChangeListener>) {
        match self.inner.listeners.lock() {
            Ok(mut listeners) => listeners.retain(|l| !Arc::ptr_eq(l, listener)),
            Err(e) => warn!("Listener registry poisoned: {}", e),
        }
    }

    pub fn listener_count(&self) -> usize {
        match self.inner.listeners.lock() {
            Ok(listeners) => listeners.len(),
            Err(e) => {
                warn!("Listener registry poisoned: {}", e);
                0
            }
        }
    }

    /// Start a batch of changes
    pub fn edit(&self) -> PrefEditor {
        PrefEditor::new(self.inner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpref_core::{PrefDocument, UpdateOptions};
    use docpref_storage::MemoryCollection;

    async fn memory_pref() -> DbPref {
        DbPref::new(Arc::new(MemoryCollection::new("prefs")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_creates_unique_key_index_once() {
        let collection: SharedCollection = Arc::new(MemoryCollection::new("prefs"));
        assert!(!collection.has_index(KEY_FIELD).await.unwrap());

        DbPref::new(collection.clone()).await.unwrap();
        assert!(collection.has_index(KEY_FIELD).await.unwrap());

        // Reopening an indexed collection is fine
        DbPref::new(collection.clone()).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_fails_over_duplicate_keys() {
        let collection = Arc::new(MemoryCollection::new("prefs"));
        for filter_key in ["x", "y"] {
            collection
                .update(
                    &Filter::key(filter_key),
                    PrefDocument::new("dup", 1i32),
                    UpdateOptions::upsert(),
                )
                .await
                .unwrap();
        }
        assert!(DbPref::new(collection).await.is_err());
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let collection: SharedCollection = Arc::new(MemoryCollection::new("prefs"));
        let result = futures::executor::block_on(DbPref::new(collection));
        assert!(matches!(result, Err(PrefError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_reads_return_defaults_when_missing() {
        let pref = memory_pref().await;
        assert!(pref.is_empty().await.unwrap());
        assert!(!pref.contains("missing").await.unwrap());
        assert!(pref.get_bool("missing", true).await);
        assert_eq!(pref.get_int("missing", 3).await, 3);
        assert_eq!(pref.get_long("missing", -1).await, -1);
        assert_eq!(pref.get_float("missing", 0.5).await, 0.5);
        assert_eq!(pref.get_string("missing", None).await, None);
        assert_eq!(
            pref.get_string("missing", Some("fallback".into())).await,
            Some("fallback".to_string())
        );
        assert_eq!(pref.get_string_set("missing", None).await, None);
    }

    #[tokio::test]
    async fn test_type_mismatch_returns_default() {
        let pref = memory_pref().await;
        assert!(pref.edit().put_int("count", 5).commit().await);

        assert_eq!(pref.get_int("count", 0).await, 5);
        assert_eq!(pref.get_long("count", 9).await, 9);
        assert!(!pref.get_bool("count", false).await);
        assert_eq!(pref.get_string("count", None).await, None);
    }

    #[tokio::test]
    async fn test_get_all() {
        let pref = memory_pref().await;
        assert!(
            pref.edit()
                .put_bool("a", true)
                .put_string("b", "text")
                .commit()
                .await
        );

        let all = pref.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("a"), Some(&PrefValue::Bool(true)));
        assert_eq!(all.get("b"), Some(&PrefValue::String("text".into())));
        assert!(!pref.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_listener_registration_is_idempotent() {
        let pref = memory_pref().await;
        let listener: Arc<dyn PrefChangeListener> = Arc::new(|_: Option<&str>| {});

        pref.register_listener(listener.clone());
        pref.register_listener(listener.clone());
        assert_eq!(pref.listener_count(), 1);

        pref.unregister_listener(&listener);
        assert_eq!(pref.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_poisoned_listener_registry_is_survivable() {
        let pref = memory_pref().await;
        let listener: Arc<dyn PrefChangeListener> = Arc::new(|_: Option<&str>| {});
        pref.register_listener(listener.clone());

        let poisoner = pref.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.inner.listeners.lock().unwrap();
            panic!("listener registry poisoned on purpose");
        })
        .join();
        assert!(result.is_err());
        assert!(pref.inner.listeners.is_poisoned());

        assert_eq!(pref.listener_count(), 0);
        pref.register_listener(listener.clone());
        pref.unregister_listener(&listener);

        // Writes still land; only notification is skipped
        assert!(pref.edit().put_int("n", 1).commit().await);
        assert_eq!(pref.get_int("n", 0).await, 1);
    }
}

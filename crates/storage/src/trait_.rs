//! Storage trait definitions
//!
//! Abstract interface for document collections and the databases that hold them

use async_trait::async_trait;
use docpref_core::{
    Filter, IndexOptions, PrefDocument, PrefError, Result, UpdateOptions,
};
use std::sync::Arc;

/// A named set of preference documents
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    async fn has_index(&self, field: &str) -> Result<bool>;

    /// Create an index on `field`; a unique index fails if existing
    /// documents already share a value for that field
    async fn create_index(&self, field: &str, options: IndexOptions) -> Result<()>;

    async fn drop_index(&self, field: &str) -> Result<()>;

    /// Documents matching `filter`, in insertion order
    async fn find(&self, filter: &Filter, limit: Option<usize>) -> Result<Vec<PrefDocument>>;

    async fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.find(filter, None).await?.len())
    }

    /// Replace every matching document with `document`, inserting it when
    /// nothing matched and `options.upsert` is set. Returns affected count.
    async fn update(
        &self,
        filter: &Filter,
        document: PrefDocument,
        options: UpdateOptions,
    ) -> Result<usize>;

    /// Remove matching documents. Returns removed count.
    async fn remove(&self, filter: &Filter) -> Result<usize>;
}

/// Shared collection reference
pub type SharedCollection = Arc<dyn DocumentCollection>;

/// A database of named collections
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Open a collection, creating it if needed
    async fn collection(&self, name: &str) -> Result<SharedCollection>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn drop_collection(&self, name: &str) -> Result<()>;
}

/// Shared database reference
pub type SharedDatabase = Arc<dyn DocumentDatabase>;

/// Collection names become table names, so only identifiers are accepted
pub fn validate_collection_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid && !name.starts_with("sqlite_") {
        Ok(())
    } else {
        Err(PrefError::InvalidCollectionName(name.to_string()))
    }
}

//! Documents and filters
//!
//! A collection holds one document per preference key.

use serde::{Deserialize, Serialize};

use crate::PrefValue;

/// Name of the document field holding the preference key
pub const KEY_FIELD: &str = "key";

/// Name of the document field holding the stored value
pub const VALUE_FIELD: &str = "value";

/// A single key/value record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefDocument {
    pub key: String,
    pub value: PrefValue,
}

impl PrefDocument {
    pub fn new(key: impl Into<String>, value: impl Into<PrefValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Query predicate over documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document in the collection
    All,
    /// Documents whose key equals the given string
    KeyEq(String),
}

impl Filter {
    pub fn key(key: impl Into<String>) -> Self {
        Filter::KeyEq(key.into())
    }

    pub fn matches(&self, document: &PrefDocument) -> bool {
        match self {
            Filter::All => true,
            Filter::KeyEq(key) => document.key == *key,
        }
    }
}

/// Options for index creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexOptions {
    pub unique: bool,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self { unique: true }
    }
}

/// Options for `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// Insert the document when the filter matches nothing
    pub upsert: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

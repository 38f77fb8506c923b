//! Docpref Core - data model for the preference store
//!
//! Contains:
//! - PrefValue: stored scalar or string set, with typed coercion
//! - PrefDocument / Filter: the single record type and its query predicate
//! - PrefError: shared error type
//! - DocprefConfig: YAML + environment configuration

mod value;
mod document;
mod error;
pub mod config;

pub use value::*;
pub use document::*;
pub use error::*;
pub use config::{Backend, DocprefConfig, RuntimeConfig, StorageConfig};

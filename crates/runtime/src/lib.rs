//! Docpref Runtime - preference store over a document collection
//!
//! Responsibilities:
//! - Typed reads with caller-supplied defaults
//! - Batched writes through an editor
//! - Synchronous commit and background apply
//! - Change listener notification
//!
//! Architecture:
//! - DbPref: read accessors and listener registry
//! - PrefEditor: pending changes, commit/apply

pub mod pref;
pub mod editor;
pub mod listener;

pub use pref::DbPref;
pub use editor::PrefEditor;
pub use listener::PrefChangeListener;

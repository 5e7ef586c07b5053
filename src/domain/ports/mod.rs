//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces adapters implement:
//! - Classifier: per-category capability heuristics
//! - KeyValueStore: persistence for the cache and manifest
//! - PageContext / NativeToolSource / ToolsNotifier: the collaborators
//!   around the discovery core
//!
//! These traits keep the discovery core independent of any document
//! source, storage technology, or transport.

pub mod classifier;
pub mod key_value_store;
pub mod page_context;

pub use classifier::{Classifier, DEFAULT_EMISSION_CAP};
pub use key_value_store::{KeyValueStore, UpdateFn};
pub use page_context::{
    NativeToolSource, NoNativeTools, NullNotifier, PageContext, PageSnapshot, StaticNativeTools,
    ToolsNotifier, ToolsUpdate, UpdateReason,
};

//! Offline queue persistence for AccuRead.
//!
//! This module provides a trait-based contract for durable storage of pending
//! captures, two implementations of it (in-memory and local JSON file), and a
//! registry for resolving a store from configuration.
//!
//! # Design Principles
//! - Order preservation: items are returned in the order they were added
//! - Async operations: all store I/O is async
//! - Unified error semantics: every store failure surfaces as `Error::Persistence`

pub mod local;
pub mod memory;
pub mod provider;
pub mod registry;

pub use local::LocalQueueStore;
pub use memory::MemoryQueueStore;
pub use provider::PersistentQueueStore;
pub use registry::{create_default_registry, StoreFactory, StoreRegistry};

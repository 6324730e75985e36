//! Common utilities and types shared across AccuRead modules.
//!
//! This module provides foundational types that are used throughout the codebase,
//! ensuring consistency and type safety between the geofencing, storage and sync
//! layers.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Coordinate, ItemId, QueueItem};

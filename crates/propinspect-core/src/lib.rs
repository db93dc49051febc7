//! Core types and traits for propinspect.
//!
//! This crate provides the data structures shared by the scanning engine and
//! its front ends: typed property values, property keys, the host capability
//! traits, the forward/reverse property index, and scan snapshots.

mod config;
mod error;
mod host;
mod index;
mod memory;
mod node;
mod report;
mod snapshot;
mod value;

pub use config::{CategoryFilter, ScanConfig, ScanConfigBuilder, ScanScope};
pub use error::{HostError, ScanError};
pub use host::{ChildSource, ModelHost, PropertySource, RawCategory, RawProperty};
pub use index::{IndexStats, ItemSet, PropertyIndex, ValueBuckets};
pub use memory::{DocumentItem, MemoryModel, ModelDocument};
pub use node::{ItemId, PropertyKey};
pub use report::{CategoryReport, IndexReport, PropertyReport, ValueReport};
pub use snapshot::{ScanOutcome, ScanSnapshot};
pub use value::{RawValue, Value};

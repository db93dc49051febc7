//! Model traversal and property aggregation engine for propinspect.
//!
//! # Overview
//!
//! `propinspect-scan` walks a host's item tree and folds every property it
//! finds into a [`PropertyIndex`]: distinct sorted values per
//! `(category, property)` key, and the items carrying each value. Key
//! features:
//!
//! - **Pre-order traversal** in host order with an explicit stack
//! - **Background scans** on a worker thread, one per session
//! - **Cooperative cancellation** between items, keeping partial results
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use propinspect_scan::{MemoryModel, PropertyKey, ScanConfig, ScanSession};
//!
//! let model = Arc::new(MemoryModel::load("model.json").unwrap());
//! let mut session = ScanSession::new();
//! session.start(model, ScanConfig::default()).unwrap();
//! session.join();
//!
//! let snapshot = session.snapshot().unwrap();
//! for value in snapshot.values(&PropertyKey::new("Geometry", "Material")) {
//!     println!("{value}");
//! }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use propinspect_scan::ScanSession;
//!
//! let session = ScanSession::new();
//! let mut progress_rx = session.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Visited {} items", progress.items_visited);
//!     }
//! });
//! ```

mod progress;
mod session;
mod walker;

pub use progress::ScanProgress;
pub use session::{ScanSession, ScanState};
pub use walker::{ItemWalker, VisitedItem};

// Re-export core types for convenience
pub use propinspect_core::{
    HostError, IndexReport, IndexStats, ItemId, MemoryModel, ModelHost, PropertyIndex,
    PropertyKey, RawValue, ScanConfig, ScanError, ScanOutcome, ScanScope, ScanSnapshot, Value,
};

/// Buffer size for progress broadcasts.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;

//! Core domain logic for the editor time diary.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: turning focus, typing and debugger signals into intervals
//! - Merging: collapsing overlapping intervals into a disjoint timeline
//! - Aggregation: deriving totals, heat maps and scores from the interval log
//! - Storage contract: the key-value surface the logs live behind

pub mod aggregate;
pub mod classifier;
pub mod comments;
pub mod merge;
pub mod signal;
pub mod store;
mod tracker;
mod types;

pub use aggregate::{AggregationConfig, AggregationResult, Periods, aggregate};
pub use classifier::{Classifier, ClassifierConfig, ClassifierState, Signal};
pub use merge::{MergedSpan, Scope, merge_timeline};
pub use signal::{HostEvent, HostEventKind, LineChange};
pub use store::{MemoryStore, Snapshot, Store};
pub use tracker::Tracker;
pub use types::{Category, ErrorEvent, TimeInterval, ValidationError};

//! Domain layer - pure deduplication logic.
//!
//! This layer contains the core concepts and invariants of the aggregator:
//! - Records and wall-clock timestamps
//! - Per-message aggregation entries
//! - The structural noise filter and ignored message set
//! - Summary line formats
//!
//! All types in this layer are pure and easily testable.

pub mod entry;
pub mod filter;
pub mod record;
pub mod summary;

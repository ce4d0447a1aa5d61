//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Message cache (storage of aggregation entries)
//! - Interceptor (per-record decisions)
//! - Sweep scheduler (periodic expiry and final tallies)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cache;
pub mod interceptor;
pub mod metrics;
pub mod ports;
pub mod reporter;
pub mod sweeper;

//! Observability Module
//!
//! - `events`: Structured event logging with consistent fields
//! - `tracing`: Subscriber setup

pub mod events;
pub mod tracing;

pub use self::tracing::{init_tracing, TracingConfig};

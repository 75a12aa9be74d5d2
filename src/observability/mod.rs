//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → logging.rs subscriber (fmt to stdout, env filter)
//! ```
//!
//! # Design Decisions
//! - Middleware instance name is attached as a span field, not repeated per event
//! - Header values are never logged

pub mod logging;

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast to server → stop accepting → drain in-flight → exit
//! ```
//!
//! # Design Decisions
//! - Config is validated before the listener is bound, so a bad rule set
//!   never receives traffic
//! - Hijacked (upgraded) connections are not drained; they end with the process

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

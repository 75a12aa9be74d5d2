//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing, timeout)
//!     → service.rs (one StreamingSink per request, handler on a blocking thread)
//!     → RenameHeaders (crate::rename) wraps the sink
//!     → proxy.rs (forward to upstream, copy head, stream body, bridge upgrades)
//!     → streaming.rs (head and body chunks handed to hyper)
//!     → Send to client
//! ```

pub mod proxy;
pub mod server;
pub mod service;
pub mod sink;
pub mod streaming;

pub use proxy::ProxyHandler;
pub use server::{HttpServer, ServerError};
pub use service::SinkService;
pub use sink::{
    Connection, Flush, Handler, Hijack, HijackError, Hijacked, Push, PushError, PushOptions,
    ResponseSink,
};
pub use streaming::{ResponseHead, StreamingSink};

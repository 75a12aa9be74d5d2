//! HTTP response header renaming middleware.
//!
//! A [`RenameHeaders`] handler wraps the response sink of every request in a
//! [`RenameWriter`], which moves the values of configured headers to new
//! names exactly once, right before the status line is committed. Hijack,
//! flush and push are forwarded to the real sink when it supports them, so
//! WebSocket upgrades and streaming responses keep working.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rename;

pub use config::schema::AppConfig;
pub use http::{HttpServer, ResponseSink};
pub use lifecycle::Shutdown;
pub use rename::{RenameHeaders, RenameHeadersLayer, RenameWriter, RuleSet};

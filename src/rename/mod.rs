//! Response header renaming.
//!
//! # Data Flow
//! ```text
//! request
//!     → RenameHeaders::serve (one RenameWriter per request)
//!     → inner handler writes status/headers/body through the writer
//!     → writer.rs renames headers once, at the commit point
//!     → real sink puts the head on the wire
//! ```
//!
//! # Design Decisions
//! - Rules are validated once and shared read-only (`Arc<RuleSet>`)
//! - Commit state lives in the per-request writer, never shared
//! - Optional sink capabilities are probed per call, not required

pub mod layer;
pub mod rules;
pub mod writer;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::config::validation::ValidationError;
use crate::config::RenameConfig;
use crate::http::sink::{Handler, ResponseSink};

pub use layer::{RenameHeadersLayer, RenameHeadersService};
pub use rules::{RenameRule, RuleSet};
pub use writer::RenameWriter;

/// Handler that renames response headers of the handler it wraps.
pub struct RenameHeaders<H> {
    name: String,
    next: H,
    rules: Arc<RuleSet>,
}

impl<H: Handler> RenameHeaders<H> {
    /// Validate `config` and wrap `next`.
    pub fn new(next: H, config: &RenameConfig) -> Result<Self, ValidationError> {
        let rules = RuleSet::new(config.rename_data.iter().cloned())?;
        Ok(Self::with_rules(next, Arc::new(rules), config.name.clone()))
    }

    /// Wrap `next` with an already validated rule set.
    pub fn with_rules(next: H, rules: Arc<RuleSet>, name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(middleware = %name, rules = rules.len(), "Rename headers middleware created");
        Self { name, next, rules }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }
}

impl<H: Handler> Handler for RenameHeaders<H> {
    fn serve(&self, req: Request<Body>, sink: &mut dyn ResponseSink) {
        let span = tracing::debug_span!("rename_headers", middleware = %self.name);
        let _enter = span.enter();

        let mut writer = RenameWriter::new(sink, &self.rules);
        self.next.serve(req, &mut writer);

        if !writer.is_committed() && !writer.is_hijacked() {
            tracing::debug!("Handler returned without committing a status");
        }
    }
}

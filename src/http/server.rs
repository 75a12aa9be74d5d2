//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Validate config and build the rule set once
//! - Create the Axum Router: every request goes to the rename interceptor
//!   wrapping the upstream proxy handler
//! - Wire up middleware (tracing, request timeout)
//! - Serve with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::validation::{parse_upstream, validate_config, ValidationError};
use crate::config::AppConfig;
use crate::http::proxy::ProxyHandler;
use crate::http::service::SinkService;
use crate::rename::{RenameHeaders, RuleSet};

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("server IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server fronting the upstream.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    rules: Arc<RuleSet>,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if the configuration does not validate.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        validate_config(&config)?;

        let upstream = parse_upstream(&config.upstream.address)?;
        let rules = Arc::new(RuleSet::new(config.rename.rename_data.iter().cloned())?);

        let proxy = ProxyHandler::new(upstream, &config.timeouts);
        let handler = RenameHeaders::with_rules(proxy, Arc::clone(&rules), config.rename.name.clone());

        let router = Self::build_router(&config, handler);
        Ok(Self {
            router,
            config,
            rules,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, handler: RenameHeaders<ProxyHandler>) -> Router {
        Router::new()
            .fallback_service(SinkService::new(handler))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            middleware = %self.config.rename.name,
            rules = self.rules.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The rule set shared by every request.
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }
}

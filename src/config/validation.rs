//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Rename rules: at least one rule, no empty or illegal header names
//! - Upstream address must be an absolute http(s) URL
//! - Timeouts must be non-zero
//!
//! # Design Decisions
//! - Stops at the first error; the index identifies the offending rule
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, Uri};
use thiserror::Error;

use crate::config::schema::{AppConfig, RenameRuleConfig};

/// A semantic configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no rename data configured: at least one rename rule is required")]
    NoRenameRules,

    #[error("rename rule {index}: existing header name cannot be empty")]
    EmptyExistingName { index: usize },

    #[error("rename rule {index}: new header name cannot be empty")]
    EmptyNewName { index: usize },

    #[error("rename rule {index}: {name:?} is not a valid header name")]
    InvalidHeaderName { index: usize, name: String },

    #[error("invalid upstream address {address:?}: {reason}")]
    InvalidUpstream { address: String, reason: String },

    #[error("timeouts.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Validate a whole application config.
pub fn validate_config(config: &AppConfig) -> Result<(), ValidationError> {
    validate_rules(&config.rename.rename_data)?;
    parse_upstream(&config.upstream.address)?;

    if config.timeouts.connect_secs == 0 {
        return Err(ValidationError::ZeroTimeout { field: "connect_secs" });
    }
    if config.timeouts.request_secs == 0 {
        return Err(ValidationError::ZeroTimeout { field: "request_secs" });
    }

    Ok(())
}

/// Validate rename rules, returning the parsed `(existing, new)` names in order.
pub fn validate_rules(
    rules: &[RenameRuleConfig],
) -> Result<Vec<(HeaderName, HeaderName)>, ValidationError> {
    if rules.is_empty() {
        return Err(ValidationError::NoRenameRules);
    }

    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            if rule.existing_header_name.is_empty() {
                return Err(ValidationError::EmptyExistingName { index });
            }
            if rule.new_header_name.is_empty() {
                return Err(ValidationError::EmptyNewName { index });
            }
            Ok((
                parse_header_name(index, &rule.existing_header_name)?,
                parse_header_name(index, &rule.new_header_name)?,
            ))
        })
        .collect()
}

/// Parse the upstream base URL. Only `http` and `https` with an authority are accepted.
pub fn parse_upstream(address: &str) -> Result<Uri, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidUpstream {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = address.parse().map_err(|e: axum::http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(invalid("scheme must be http or https")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(uri)
}

fn parse_header_name(index: usize, name: &str) -> Result<HeaderName, ValidationError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| ValidationError::InvalidHeaderName {
        index,
        name: name.to_string(),
    })
}

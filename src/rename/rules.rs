//! Rename rule set.
//!
//! # Responsibilities
//! - Hold the validated, ordered `(existing, new)` header pairs
//! - Apply them to a header map at the commit point
//!
//! # Design Decisions
//! - Built once per interceptor, shared read-only via `Arc` across requests
//! - Rules run in configured order against the mutating map, so a rule may
//!   consume the output of an earlier one
//! - A rename onto a header that already has values replaces those values

use std::slice;

use axum::http::{header::Entry, HeaderMap, HeaderName, HeaderValue};

use crate::config::validation::{validate_rules, ValidationError};
use crate::config::RenameRuleConfig;

/// A validated rename rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    existing: HeaderName,
    new: HeaderName,
}

impl RenameRule {
    pub fn existing(&self) -> &HeaderName {
        &self.existing
    }

    pub fn new_name(&self) -> &HeaderName {
        &self.new
    }

    /// Move every value of `existing` to `new`. Returns false if `existing` is absent.
    fn apply(&self, headers: &mut HeaderMap) -> bool {
        let values: Vec<HeaderValue> = match headers.entry(&self.existing) {
            Entry::Occupied(entry) => entry.remove_entry_mult().1.collect(),
            Entry::Vacant(_) => return false,
        };

        headers.remove(&self.new);
        for value in values {
            headers.append(self.new.clone(), value);
        }
        true
    }
}

/// An ordered, non-empty, immutable set of rename rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<RenameRule>,
}

impl RuleSet {
    /// Validate and build a rule set.
    pub fn new<I>(rules: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = RenameRuleConfig>,
    {
        let rules: Vec<RenameRuleConfig> = rules.into_iter().collect();
        let rules = validate_rules(&rules)?
            .into_iter()
            .map(|(existing, new)| RenameRule { existing, new })
            .collect();
        Ok(Self { rules })
    }

    /// Apply every rule in order. Returns how many rules found their source header.
    pub fn apply(&self, headers: &mut HeaderMap) -> usize {
        self.rules.iter().filter(|rule| rule.apply(headers)).count()
    }

    pub fn iter(&self) -> slice::Iter<'_, RenameRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a RenameRule;
    type IntoIter = slice::Iter<'a, RenameRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> RuleSet {
        RuleSet::new(pairs.iter().map(|(e, n)| RenameRuleConfig::new(*e, *n))).unwrap()
    }

    fn values<'a>(headers: &'a HeaderMap, name: &str) -> Vec<&'a str> {
        headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    #[test]
    fn test_construction() {
        let set = rules(&[("X-A", "X-B"), ("X-C", "X-D")]);
        assert_eq!(set.len(), 2);
        let names: Vec<_> = set.iter().map(|r| r.existing().as_str()).collect();
        assert_eq!(names, ["x-a", "x-c"]);

        assert_eq!(
            RuleSet::new(Vec::new()).unwrap_err(),
            ValidationError::NoRenameRules
        );
        assert_eq!(
            RuleSet::new(vec![RenameRuleConfig::new("X-A", "")]).unwrap_err(),
            ValidationError::EmptyNewName { index: 0 }
        );
    }

    #[test]
    fn test_moves_all_values_in_order() {
        let set = rules(&[("X-Old", "X-New")]);
        let mut headers = HeaderMap::new();
        headers.append("x-old", HeaderValue::from_static("a"));
        headers.append("x-old", HeaderValue::from_static("b"));

        assert_eq!(set.apply(&mut headers), 1);
        assert_eq!(values(&headers, "x-new"), ["a", "b"]);
        assert!(!headers.contains_key("x-old"));
    }

    #[test]
    fn test_missing_source_is_noop() {
        let set = rules(&[("X-Old", "X-New")]);
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        assert_eq!(set.apply(&mut headers), 0);
        assert!(!headers.contains_key("x-new"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_chained_rules_see_earlier_output() {
        let set = rules(&[("X", "Y"), ("Y", "Z")]);
        let mut headers = HeaderMap::new();
        headers.insert("x", HeaderValue::from_static("1"));

        assert_eq!(set.apply(&mut headers), 2);
        assert_eq!(values(&headers, "z"), ["1"]);
        assert!(!headers.contains_key("x"));
        assert!(!headers.contains_key("y"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_rename_overwrites_existing_target() {
        let set = rules(&[("X-Old", "X-New")]);
        let mut headers = HeaderMap::new();
        headers.insert("x-old", HeaderValue::from_static("moved"));
        headers.append("x-new", HeaderValue::from_static("stale-1"));
        headers.append("x-new", HeaderValue::from_static("stale-2"));

        set.apply(&mut headers);
        assert_eq!(values(&headers, "x-new"), ["moved"]);
    }

    #[test]
    fn test_rename_onto_itself_keeps_values() {
        let set = rules(&[("X-Same", "x-same")]);
        let mut headers = HeaderMap::new();
        headers.append("x-same", HeaderValue::from_static("a"));
        headers.append("x-same", HeaderValue::from_static("b"));

        set.apply(&mut headers);
        assert_eq!(values(&headers, "x-same"), ["a", "b"]);
    }
}

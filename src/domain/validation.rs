//! Validation result tree reported by the signing service.
//!
//! The service validates signer certificates (and, for some calls, whole
//! signatures) and answers with three ordered collections: errors, warnings
//! and passed checks. Each item may carry the results of a nested validation,
//! e.g. the issuer certificate's own chain check, to arbitrary depth.
//!
//! Only `errors` decides validity; warnings and passed checks are
//! informational.

use crate::infra::error::RestPkiResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Results of one validation performed by the signing service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResults {
    /// Failed checks; any entry makes the results invalid
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<ValidationItem>,
    /// Non-fatal findings
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<ValidationItem>,
    /// Checks that succeeded
    #[serde(default, deserialize_with = "null_as_empty")]
    pub passed_checks: Vec<ValidationItem>,
}

/// A single check outcome, optionally with the results of a nested validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationItem {
    /// Service-defined tag naming the check (e.g. `CertificateRevocationStatus`)
    #[serde(rename = "type")]
    pub item_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_validation_results: Option<Box<ValidationResults>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ValidationItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ValidationItem>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ValidationResults {
    /// Materialize the tree from the JSON model returned by the service.
    ///
    /// # Errors
    /// Returns a decode error when the model does not have the expected shape.
    pub fn from_model(model: serde_json::Value) -> RestPkiResult<Self> {
        Ok(serde_json::from_value(model)?)
    }

    /// True if and only if no check failed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of checks at this level (nested results are not counted)
    #[must_use]
    pub fn checks_performed(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.passed_checks.len()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// One-line summary, e.g. `Validation results: 3 checks performed, 1 errors, 2 passed`
    #[must_use]
    pub fn summary(&self, indentation_level: usize) -> String {
        let tab = "\t".repeat(indentation_level);
        let mut text = format!("{tab}Validation results: ");
        let checks = self.checks_performed();
        if checks == 0 {
            text.push_str("no checks performed");
            return text;
        }

        text.push_str(&format!("{checks} checks performed"));
        if self.has_errors() {
            text.push_str(&format!(", {} errors", self.errors.len()));
        }
        if self.has_warnings() {
            text.push_str(&format!(", {} warnings", self.warnings.len()));
        }
        if !self.passed_checks.is_empty() {
            if !self.has_errors() && !self.has_warnings() {
                text.push_str(", all passed");
            } else {
                text.push_str(&format!(", {} passed", self.passed_checks.len()));
            }
        }
        text
    }

    /// Human-readable report: summary, then errors, warnings and passed
    /// checks, with nested results indented one tab further.
    #[must_use]
    pub fn to_string_indented(&self, indentation_level: usize) -> String {
        let tab = "\t".repeat(indentation_level);
        let mut text = self.summary(indentation_level);

        let sections = [
            ("Errors", &self.errors),
            ("Warnings", &self.warnings),
            ("Passed checks", &self.passed_checks),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            text.push_str(&format!("\n{tab}{title}:\n"));
            text.push_str(&join_items(items, indentation_level));
        }
        text
    }
}

fn join_items(items: &[ValidationItem], indentation_level: usize) -> String {
    let tab = "\t".repeat(indentation_level);
    items
        .iter()
        .map(|item| format!("{tab}- {}", item.to_string_indented(indentation_level)))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ValidationItem {
    #[must_use]
    pub fn to_string_indented(&self, indentation_level: usize) -> String {
        let mut text = self.message.clone();
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.is_empty()) {
            text.push_str(&format!(" ({detail})"));
        }
        if let Some(inner) = &self.inner_validation_results {
            text.push('\n');
            text.push_str(&inner.to_string_indented(indentation_level + 1));
        }
        text
    }
}

impl fmt::Display for ValidationResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_indented(0))
    }
}

impl fmt::Display for ValidationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_indented(0))
    }
}

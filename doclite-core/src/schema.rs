//! The schema/validation contract.
//!
//! The store never validates documents itself. Every model is paired with an
//! implementation of [`Schema`], an external collaborator that normalizes an
//! input document (applying defaults, rejecting invalid shapes) into the
//! canonical stored shape. A rejected document is surfaced to the caller as a
//! [`ValidationFailure`] and is never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Document;

/// Capability trait for schema validation and normalization.
///
/// Implementations take an input document and either return the normalized
/// document (with defaults applied) or a structured failure. The store calls
/// this exactly once per `create` and treats an `Err` as a rejection; nothing
/// reaches the in-memory store or the persistence layer.
pub trait Schema: Send + Sync {
    /// Normalizes `input` into the canonical stored shape.
    fn normalize(&self, input: Document) -> Result<Document, ValidationFailure>;
}

/// A structured description of why a document failed validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// The individual issues found, in discovery order.
    pub issues: Vec<ValidationIssue>,
}

/// One validation issue: the path of the offending field and a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path from the document root, e.g. `["address", "city"]`.
    pub path: Vec<String>,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationFailure {
    /// Convenience constructor for a failure with a single issue.
    pub fn single(path: impl IntoIterator<Item = impl Into<String>>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into_iter().map(Into::into).collect(),
                message: message.into(),
            }],
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "invalid document");
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            if issue.path.is_empty() {
                write!(f, "{}", issue.message)?;
            } else {
                write!(f, "{}: {}", issue.path.join("."), issue.message)?;
            }
        }
        Ok(())
    }
}

/// A pass-through schema that accepts any document unchanged.
///
/// Useful for prototyping and for models whose shape is enforced elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl Schema for Unchecked {
    fn normalize(&self, input: Document) -> Result<Document, ValidationFailure> {
        Ok(input)
    }
}

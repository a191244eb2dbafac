//! Query trees and the recursive matching engine.
//!
//! A query is either a whole-document predicate or a tree that mirrors the
//! shape of the documents it selects. Each leaf of the tree is an explicit
//! tagged node: a literal compared by deep equality, a predicate over the
//! field value, or a nested sub-query. Fields absent from the query impose
//! no constraint (AND-of-specified-fields semantics), and the empty query
//! matches every document.
//!
//! # Example
//!
//! ```ignore
//! use doclite_core::{ops, query::{Query, QueryDoc}};
//!
//! let adults = Query::from(
//!     QueryDoc::new()
//!         .filter("age", ops::gte(18.0))
//!         .nested("address", QueryDoc::new().field("country", "NL")),
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Document, Value};

/// A predicate over a single field value.
///
/// Cheap to clone; the underlying closure is shared.
#[derive(Clone)]
pub struct FieldPredicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl FieldPredicate {
    /// Wraps a closure as a field predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Evaluates the predicate against a field value.
    pub fn test(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldPredicate")
    }
}

/// A predicate over an entire document.
#[derive(Clone)]
pub struct DocPredicate(Arc<dyn Fn(&Document) -> bool + Send + Sync>);

impl DocPredicate {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn test(&self, document: &Document) -> bool {
        (self.0)(document)
    }
}

impl fmt::Debug for DocPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocPredicate")
    }
}

/// One constraint inside a query tree.
#[derive(Debug, Clone)]
pub enum QueryNode {
    /// Matches when the field deep-equals the literal.
    Literal(Value),
    /// Matches when the predicate accepts the field value. Absent fields
    /// are presented to the predicate as [`Value::Null`].
    Predicate(FieldPredicate),
    /// Recurses into a nested document. Never matches a non-object field;
    /// arrays and opaque values are leaves.
    Nested(QueryDoc),
}

/// A partial query tree: constraints keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct QueryDoc {
    fields: BTreeMap<String, QueryNode>,
}

impl QueryDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrains a field to deep-equal a literal value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), QueryNode::Literal(value.into()));
        self
    }

    /// Constrains a field with a predicate.
    pub fn filter(mut self, name: impl Into<String>, predicate: FieldPredicate) -> Self {
        self.fields.insert(name.into(), QueryNode::Predicate(predicate));
        self
    }

    /// Constrains a nested document field with a sub-query.
    pub fn nested(mut self, name: impl Into<String>, sub: QueryDoc) -> Self {
        self.fields.insert(name.into(), QueryNode::Nested(sub));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&String, &QueryNode)> {
        self.fields.iter()
    }
}

/// A query: either a field tree or a whole-document predicate.
#[derive(Debug, Clone)]
pub enum Query {
    /// AND-of-specified-fields tree.
    Fields(QueryDoc),
    /// A single predicate over the whole document.
    Whole(DocPredicate),
}

impl Query {
    /// The empty query, which matches every document.
    pub fn all() -> Self {
        Query::Fields(QueryDoc::new())
    }

    /// Builds a whole-document predicate query.
    pub fn whole<F>(predicate: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Query::Whole(DocPredicate::new(predicate))
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::all()
    }
}

impl From<QueryDoc> for Query {
    fn from(doc: QueryDoc) -> Self {
        Query::Fields(doc)
    }
}

/// Checks whether a document matches a query.
///
/// Traversal is depth-first over the query tree and short-circuits on the
/// first failed field.
pub fn matches(document: &Document, query: &Query) -> bool {
    match query {
        Query::Whole(predicate) => predicate.test(document),
        Query::Fields(fields) => matches_fields(document, fields),
    }
}

fn matches_fields(document: &Document, query: &QueryDoc) -> bool {
    for (field, node) in query.fields() {
        let value = document.get(field);
        let hit = match node {
            QueryNode::Nested(sub) => match value {
                Some(Value::Object(inner)) => matches_fields(inner, sub),
                _ => false,
            },
            QueryNode::Predicate(predicate) => predicate.test(value.unwrap_or(&Value::Null)),
            QueryNode::Literal(expected) => value.unwrap_or(&Value::Null) == expected,
        };
        if !hit {
            return false;
        }
    }
    true
}

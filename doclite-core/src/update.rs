//! Update trees and the recursive application engine.
//!
//! An update is either a whole-document transform or a tree that mirrors the
//! document's shape. Each leaf is an explicit tagged node: a literal that
//! replaces the field, an updater function applied to the old value, or a
//! nested sub-update. Updates are deep partial merges: fields not mentioned
//! are left untouched. The engine itself never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Document, Value};

/// An updater for a single field: takes the old value, returns the new one.
///
/// Cheap to clone; the underlying closure is shared.
#[derive(Clone)]
pub struct FieldUpdater(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl FieldUpdater {
    /// Wraps a closure as a field updater.
    pub fn new<F>(updater: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(updater))
    }

    /// Applies the updater to an old value.
    pub fn apply(&self, old: Value) -> Value {
        (self.0)(old)
    }
}

impl fmt::Debug for FieldUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldUpdater")
    }
}

/// A whole-document transform.
///
/// The transform receives the live document and may mutate it in place. If
/// it additionally returns a document, the returned top-level fields are
/// merged back into the live document (a partial merge, not a replacement).
#[derive(Clone)]
pub struct DocTransform(Arc<dyn Fn(&mut Document) -> Option<Document> + Send + Sync>);

impl DocTransform {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&mut Document) -> Option<Document> + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    pub fn run(&self, document: &mut Document) -> Option<Document> {
        (self.0)(document)
    }
}

impl fmt::Debug for DocTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocTransform")
    }
}

/// One change inside an update tree.
#[derive(Debug, Clone)]
pub enum UpdateNode {
    /// Replaces the field with the literal (inserting it when absent).
    Literal(Value),
    /// Replaces the field with `updater(old)`. Absent fields are presented
    /// to the updater as [`Value::Null`].
    Apply(FieldUpdater),
    /// Recurses into a nested document. When the current field value is not
    /// an object, the field is replaced by the result of applying the
    /// sub-update to an empty document.
    Nested(UpdateDoc),
}

/// A partial update tree: changes keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct UpdateDoc {
    fields: BTreeMap<String, UpdateNode>,
}

impl UpdateDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field to a literal value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), UpdateNode::Literal(value.into()));
        self
    }

    /// Applies an updater function to a field.
    pub fn apply(mut self, name: impl Into<String>, updater: FieldUpdater) -> Self {
        self.fields.insert(name.into(), UpdateNode::Apply(updater));
        self
    }

    /// Applies a sub-update to a nested document field.
    pub fn nested(mut self, name: impl Into<String>, sub: UpdateDoc) -> Self {
        self.fields.insert(name.into(), UpdateNode::Nested(sub));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&String, &UpdateNode)> {
        self.fields.iter()
    }
}

/// An update: either a field tree or a whole-document transform.
#[derive(Debug, Clone)]
pub enum Update {
    /// Deep partial merge of the given field tree.
    Fields(UpdateDoc),
    /// A single transform over the whole document.
    Transform(DocTransform),
}

impl Update {
    /// Builds a whole-document transform update.
    pub fn transform<F>(transform: F) -> Self
    where
        F: Fn(&mut Document) -> Option<Document> + Send + Sync + 'static,
    {
        Update::Transform(DocTransform::new(transform))
    }
}

impl From<UpdateDoc> for Update {
    fn from(doc: UpdateDoc) -> Self {
        Update::Fields(doc)
    }
}

/// Applies an update to a document in place.
pub fn apply(document: &mut Document, update: &Update) {
    match update {
        Update::Transform(transform) => {
            if let Some(merged) = transform.run(document) {
                for (field, value) in merged {
                    document.insert(field, value);
                }
            }
        }
        Update::Fields(fields) => apply_fields(document, fields),
    }
}

fn apply_fields(document: &mut Document, update: &UpdateDoc) {
    for (field, node) in update.fields() {
        match node {
            UpdateNode::Literal(value) => {
                document.insert(field.clone(), value.clone());
            }
            UpdateNode::Apply(updater) => {
                let old = document.remove(field).unwrap_or(Value::Null);
                document.insert(field.clone(), updater.apply(old));
            }
            UpdateNode::Nested(sub) => match document.get_mut(field) {
                Some(Value::Object(inner)) => apply_fields(inner, sub),
                _ => {
                    let mut fresh = Document::new();
                    apply_fields(&mut fresh, sub);
                    document.insert(field.clone(), Value::Object(fresh));
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn person() -> Document {
        doc! {
            "name" => "John",
            "age" => 20,
            "address" => doc! { "city" => "Utrecht", "zip" => "3511" },
        }
    }

    #[test]
    fn literal_set_leaves_other_fields_untouched() {
        let mut document = person();
        apply(&mut document, &UpdateDoc::new().set("age", 21).into());

        assert_eq!(document.get("age"), Some(&Value::Number(21.0)));
        assert_eq!(document.get("name"), Some(&Value::from("John")));
        assert_eq!(document.len(), 3);
    }

    #[test]
    fn literal_set_inserts_missing_fields() {
        let mut document = person();
        apply(&mut document, &UpdateDoc::new().set("email", "john@example.com").into());
        assert_eq!(document.get("email"), Some(&Value::from("john@example.com")));
    }

    #[test]
    fn updater_receives_the_old_value() {
        let mut document = person();
        let bump = FieldUpdater::new(|old| match old {
            Value::Number(n) => Value::Number(n + 1.0),
            other => other,
        });
        apply(&mut document, &UpdateDoc::new().apply("age", bump).into());
        assert_eq!(document.get("age"), Some(&Value::Number(21.0)));
    }

    #[test]
    fn nested_update_merges_deeply() {
        let mut document = person();
        let update = UpdateDoc::new().nested("address", UpdateDoc::new().set("city", "Delft"));
        apply(&mut document, &update.into());

        let address = document.get("address").and_then(Value::as_object).unwrap();
        assert_eq!(address.get("city"), Some(&Value::from("Delft")));
        assert_eq!(address.get("zip"), Some(&Value::from("3511")), "siblings survive");
    }

    #[test]
    fn nested_update_rebuilds_non_object_fields() {
        let mut document = person();
        let update = UpdateDoc::new().nested("name", UpdateDoc::new().set("first", "John"));
        apply(&mut document, &update.into());

        let name = document.get("name").and_then(Value::as_object).unwrap();
        assert_eq!(name.get("first"), Some(&Value::from("John")));
    }

    #[test]
    fn transform_side_effects_apply_directly() {
        let mut document = person();
        let update = Update::transform(|doc| {
            doc.remove("address");
            None
        });
        apply(&mut document, &update);
        assert!(!document.contains_key("address"));
    }

    #[test]
    fn transform_return_value_merges_top_level_fields() {
        let mut document = person();
        let update = Update::transform(|_| Some(doc! { "age" => 30 }));
        apply(&mut document, &update);

        assert_eq!(document.get("age"), Some(&Value::Number(30.0)));
        assert_eq!(document.get("name"), Some(&Value::from("John")), "partial merge");
    }
}

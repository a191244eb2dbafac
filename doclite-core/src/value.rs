//! The dynamic value tree stored in documents.
//!
//! A [`Value`] is either a JSON-native scalar/array/object, a document
//! identifier, or an opaque transformer-backed value (datetime, set, map,
//! blob, or an application-defined type). Documents are field-name-to-value
//! trees; the whole store is a map of model names to collections of
//! documents.
//!
//! Deep equality over values is order-sensitive for arrays and key-sorted
//! for objects, which is exactly the canonical JSON form the store persists.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::id::DocumentId;

/// One document: a mapping from field names to values.
pub type Document = BTreeMap<String, Value>;

/// One collection: a mapping from identifier strings to documents.
pub type CollectionData = BTreeMap<String, Document>;

/// The whole store: a mapping from model names to collections.
pub type StoreData = BTreeMap<String, CollectionData>;

/// A single value inside a document.
#[derive(Debug, Clone)]
pub enum Value {
    /// The JSON null value. Absent fields read as `Null` during matching.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. All numerics are normalized to `f64`, matching JSON.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence of values. Arrays are leaves for query and
    /// update recursion: they are matched and replaced as a whole.
    Array(Vec<Value>),
    /// A nested document.
    Object(Document),
    /// A reference to a document identifier.
    Id(DocumentId),
    /// An opaque value that round-trips through persistence via a
    /// registered transformer.
    Opaque(Box<dyn OpaqueValue>),
}

impl Value {
    /// Wraps an opaque-capable value.
    pub fn opaque<T: Opaque>(value: T) -> Value {
        Value::Opaque(Box::new(value))
    }

    /// Returns the nested document if this value is an object.
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    /// Mutable variant of [`Value::as_object`].
    pub fn as_object_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns the elements if this value is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the number if this value is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the identifier if this value is one.
    pub fn as_id(&self) -> Option<&DocumentId> {
        match self {
            Value::Id(id) => Some(id),
            _ => None,
        }
    }

    /// Attempts to view this value as a concrete opaque type.
    pub fn as_opaque<T: Opaque>(&self) -> Option<&T> {
        match self {
            Value::Opaque(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// True if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Id(a), Value::Id(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a.eq_box(b.as_ref()),
            _ => false,
        }
    }
}

/// Marker trait for types that can live inside a document as opaque values.
///
/// Implementing it is a one-liner; the object-safe machinery is provided by
/// a blanket [`OpaqueValue`] implementation:
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Temperature(f64);
///
/// impl Opaque for Temperature {}
/// ```
pub trait Opaque: Any + Debug + Send + Sync + Clone + PartialEq {}

/// Type-erased opaque value, allowing different concrete types to be stored
/// uniformly inside the value tree.
pub trait OpaqueValue: Send + Sync + Debug {
    /// Returns a reference to the value as a generic `Any` type.
    fn as_any(&self) -> &dyn Any;

    /// Clones the value into a new boxed `OpaqueValue`.
    fn clone_box(&self) -> Box<dyn OpaqueValue>;

    /// Deep equality against another type-erased value. Values of different
    /// concrete types are never equal.
    fn eq_box(&self, other: &dyn OpaqueValue) -> bool;
}

impl<T: Opaque> OpaqueValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn OpaqueValue> {
        Box::new(self.clone())
    }

    fn eq_box(&self, other: &dyn OpaqueValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

impl dyn OpaqueValue {
    /// Attempts to downcast a reference to a specific opaque type.
    pub fn downcast_ref<T: Opaque>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl Clone for Box<dyn OpaqueValue> {
    fn clone(&self) -> Box<dyn OpaqueValue> {
        self.clone_box()
    }
}

impl Opaque for DateTime<Utc> {}

/// An ordered set of values. Membership uses deep equality; insertion
/// order is preserved and duplicates are rejected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSet {
    members: Vec<Value>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a member, returning false if it was already present.
    pub fn insert(&mut self, member: impl Into<Value>) -> bool {
        let member = member.into();
        if self.members.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub fn contains(&self, member: &Value) -> bool {
        self.members.contains(member)
    }

    pub fn members(&self) -> &[Value] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for ValueSet {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for member in iter {
            set.insert(member);
        }
        set
    }
}

impl Opaque for ValueSet {}

/// An ordered map with string keys. Unlike a nested document, a `ValueMap`
/// preserves insertion order and is treated as a leaf by the query and
/// update engines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry, keeping the original position on
    /// replacement.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Opaque for ValueMap {}

/// A binary blob, persisted as base64 text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Opaque for Blob {}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Object(v)
    }
}

impl From<DocumentId> for Value {
    fn from(v: DocumentId) -> Self {
        Value::Id(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::opaque(v)
    }
}

impl From<ValueSet> for Value {
    fn from(v: ValueSet) -> Self {
        Value::opaque(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Value::opaque(v)
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::opaque(v)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```ignore
/// let user = doc! {
///     "name" => "John",
///     "age" => 20,
///     "address" => doc! { "city" => "Utrecht" },
///     "hobbies" => vec!["chess", "sailing"],
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::value::Document::new()
    };
    ( $( $key:expr => $value:expr ),+ $(,)? ) => {{
        let mut document = $crate::value::Document::new();
        $(
            document.insert(
                ::std::string::String::from($key),
                $crate::value::Value::from($value),
            );
        )+
        document
    }};
}

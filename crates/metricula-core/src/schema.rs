//! Field schema
//!
//! A [`Schema`] is the ordered set of fields a formula may reference, as
//! supplied by the data explorer. Field names are expected to be unique; a
//! schema that violates this is still accepted, but every ambiguous name is
//! treated as unknown so formulas never guess between two definitions.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldType {
    Number,
    String,
}

impl FieldType {
    /// Lowercase type name as used in schema documents
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::String => "string",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Ok(FieldType::Number),
            "string" => Ok(FieldType::String),
            _ => Err(Error::InvalidFieldType(s.to_string())),
        }
    }
}

/// A named field available to formulas
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub field_type: FieldType,
    /// Human-readable description shown next to the field list
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub description: Option<String>,
}

impl Field {
    /// Create a new field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: None,
        }
    }

    /// Create a numeric field
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Create a string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Set a description for this field
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the name can appear as an identifier inside a formula
    pub fn is_referenceable(&self) -> bool {
        is_identifier(&self.name)
    }
}

/// Check that `name` matches `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    lazy_regex::regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", name)
}

/// Ordered collection of fields with name lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    /// Name → index into `fields`, excluding ambiguous names
    index: HashMap<String, usize>,
    /// Names declared more than once
    ambiguous: HashSet<String>,
}

impl Schema {
    /// Build a schema from fields in declaration order
    ///
    /// Duplicate and non-identifier names are reported once each as a
    /// registry contract violation and can never be resolved by [`lookup`].
    ///
    /// [`lookup`]: Schema::lookup
    pub fn new(fields: Vec<Field>) -> Self {
        let mut index = HashMap::with_capacity(fields.len());
        let mut ambiguous = HashSet::new();

        for (i, field) in fields.iter().enumerate() {
            if !field.is_referenceable() {
                tracing::warn!(field = %field.name, "schema field name is not a valid identifier");
                continue;
            }
            if ambiguous.contains(&field.name) {
                continue;
            }
            if index.insert(field.name.clone(), i).is_some() {
                tracing::warn!(field = %field.name, "schema declares field more than once");
                index.remove(&field.name);
                ambiguous.insert(field.name.clone());
            }
        }

        Self {
            fields,
            index,
            ambiguous,
        }
    }

    /// Create an empty schema
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve a field by name
    pub fn lookup(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Resolve a field by name, failing for unknown or ambiguous names
    pub fn field(&self, name: &str) -> crate::Result<&Field> {
        self.lookup(name).ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Whether a name resolves to exactly one field
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names declared more than once
    pub fn duplicate_names(&self) -> impl Iterator<Item = &str> {
        self.ambiguous.iter().map(String::as_str)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Schema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Schema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Field>::deserialize(deserializer).map(Schema::new)
    }
}

/// Source of schema snapshots, injected into the formula store
///
/// The registry is owned by the data explorer; the engine only ever reads
/// immutable snapshots of it.
pub trait SchemaRegistry {
    /// Current schema
    fn snapshot(&self) -> Arc<Schema>;
}

impl SchemaRegistry for Schema {
    fn snapshot(&self) -> Arc<Schema> {
        Arc::new(self.clone())
    }
}

impl SchemaRegistry for Arc<Schema> {
    fn snapshot(&self) -> Arc<Schema> {
        Arc::clone(self)
    }
}

/// Cloneable registry handle whose schema can be replaced
///
/// Clones share the same slot, so the data explorer can keep one handle
/// and hand another to the store.
#[derive(Debug, Clone, Default)]
pub struct SharedSchema {
    current: Rc<RefCell<Arc<Schema>>>,
}

impl SharedSchema {
    pub fn new(schema: Schema) -> Self {
        Self {
            current: Rc::new(RefCell::new(Arc::new(schema))),
        }
    }

    /// Replace the schema seen by every handle
    pub fn replace(&self, schema: Schema) {
        *self.current.borrow_mut() = Arc::new(schema);
    }
}

impl SchemaRegistry for SharedSchema {
    fn snapshot(&self) -> Arc<Schema> {
        Arc::clone(&self.current.borrow())
    }
}

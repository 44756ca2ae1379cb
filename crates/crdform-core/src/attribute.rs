//! Schema descriptor: attribute types, presence and nested objects
//!
//! A [`ResourceSchema`](crate::ResourceSchema) is a tree of [`Attribute`]s.
//! Attribute names are Terraform-style snake_case; every attribute also
//! remembers the Kubernetes JSON field name it maps to.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

use crate::validators::Validator;

/// Semantic type of an attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(ObjectType),
    /// Passed through verbatim (preserve-unknown, int-or-string, embedded)
    Dynamic,
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        Self::Map(Box::new(element))
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Whether the top level of a JSON value has this type's shape
    ///
    /// Containers are not inspected; callers recurse themselves.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Int64 => as_integer(value).is_some(),
            Self::Float64 => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::List(_) => value.is_array(),
            Self::Map(_) | Self::Object(_) => value.is_object(),
            Self::Dynamic => true,
        }
    }

    /// Short name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(element) => write!(f, "list({})", element),
            Self::Map(element) => write!(f, "map({})", element),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Integer view of a JSON number, accepting floats without a fractional part
pub fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Whether the user, the server, or both set an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Set by the provider or server only
    Computed,
    /// May be set by the user, otherwise filled in by the server
    OptionalComputed,
}

impl Presence {
    pub fn is_required(self) -> bool {
        self == Self::Required
    }

    /// Whether a configuration may set the attribute
    pub fn is_configurable(self) -> bool {
        self != Self::Computed
    }

    pub fn is_computed(self) -> bool {
        matches!(self, Self::Computed | Self::OptionalComputed)
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Optional => write!(f, "optional"),
            Self::Computed => write!(f, "computed"),
            Self::OptionalComputed => write!(f, "optional, computed"),
        }
    }
}

/// A named attribute of a resource or nested object
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Kubernetes field name
    pub json_name: String,
    pub type_: AttributeType,
    pub presence: Presence,
    pub description: Option<String>,
    pub validators: Vec<Validator>,
    /// Changing the value forces the resource to be replaced
    pub force_new: bool,
}

impl Attribute {
    pub fn new(json_name: impl Into<String>, type_: AttributeType, presence: Presence) -> Self {
        Self {
            json_name: json_name.into(),
            type_,
            presence,
            description: None,
            validators: Vec::new(),
            force_new: false,
        }
    }

    pub fn required(json_name: impl Into<String>, type_: AttributeType) -> Self {
        Self::new(json_name, type_, Presence::Required)
    }

    pub fn optional(json_name: impl Into<String>, type_: AttributeType) -> Self {
        Self::new(json_name, type_, Presence::Optional)
    }

    pub fn computed(json_name: impl Into<String>, type_: AttributeType) -> Self {
        Self::new(json_name, type_, Presence::Computed)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Use `fallback` when the attribute has no description
    #[must_use]
    pub fn description_or(mut self, fallback: impl Into<String>) -> Self {
        if self.description.as_deref().is_none_or(str::is_empty) {
            self.description = Some(fallback.into());
        }
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Nested object type, if this is an object attribute
    pub fn object(&self) -> Option<&ObjectType> {
        self.type_.as_object()
    }
}

/// Ordered set of named attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectType {
    pub attributes: IndexMap<String, Attribute>,
}

impl ObjectType {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, attribute: Attribute) {
        self.attributes.insert(name.into(), attribute);
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Attribute)> {
        self.attributes.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Look up an attribute by a dotted path of attribute names
    pub fn get_path(&self, path: &str) -> Option<&Attribute> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.object()?.get(part)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> ObjectType {
        ObjectType::new()
            .with(
                "name",
                Attribute::required("name", AttributeType::String).force_new(),
            )
            .with(
                "labels",
                Attribute::optional("labels", AttributeType::map(AttributeType::String)),
            )
    }

    #[test]
    fn test_accepts() {
        assert!(AttributeType::String.accepts(&json!("x")));
        assert!(!AttributeType::String.accepts(&json!(1)));
        assert!(AttributeType::Int64.accepts(&json!(3)));
        assert!(AttributeType::Int64.accepts(&json!(3.0)));
        assert!(!AttributeType::Int64.accepts(&json!(3.5)));
        assert!(AttributeType::Float64.accepts(&json!(3)));
        assert!(AttributeType::list(AttributeType::Bool).accepts(&json!([])));
        assert!(AttributeType::Object(metadata()).accepts(&json!({})));
        assert!(AttributeType::Dynamic.accepts(&json!(null)));
    }

    #[test]
    fn test_display() {
        let t = AttributeType::list(AttributeType::map(AttributeType::Int64));
        assert_eq!(t.to_string(), "list(map(int64))");
        assert_eq!(Presence::OptionalComputed.to_string(), "optional, computed");
    }

    #[test]
    fn test_presence() {
        assert!(Presence::Required.is_configurable());
        assert!(!Presence::Computed.is_configurable());
        assert!(Presence::OptionalComputed.is_computed());
        assert!(!Presence::Optional.is_required());
    }

    #[test]
    fn test_get_path() {
        let root = ObjectType::new().with(
            "metadata",
            Attribute::required("metadata", AttributeType::Object(metadata())),
        );
        let name = root.get_path("metadata.name").unwrap();
        assert!(name.force_new);
        assert_eq!(name.json_name, "name");
        assert!(root.get_path("metadata.missing").is_none());
        assert!(root.get_path("metadata.name.deeper").is_none());
        assert_eq!(root.names().collect::<Vec<_>>(), vec!["metadata"]);
    }
}

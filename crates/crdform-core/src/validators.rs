//! Attribute validators
//!
//! Validators come from two places: OpenAPI constraints of the CRD (enum,
//! bounds, lengths, patterns, sizes) and the fixed Kubernetes naming rules
//! applied to `metadata`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::attribute::AttributeType;

/// Maximum length of a DNS-1123 label (namespaces)
pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;

/// Maximum length of a DNS-1123 subdomain (object names)
pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

/// Maximum length of the name part of a qualified name and of label values
pub const QUALIFIED_NAME_MAX_LENGTH: usize = 63;

/// Maximum total size of all annotation keys and values
pub const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * 1024;

static DNS1123_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static DNS1123_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid regex")
});

static QUALIFIED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("valid regex"));

/// Compiled regular expression, compared by its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation rule attached to an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Value must be one of the listed values
    OneOf(Vec<Value>),
    /// Numeric bounds
    NumberBetween {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
        exclusive_max: bool,
    },
    /// Number must be a multiple of the given factor
    MultipleOf(f64),
    /// String length bounds (in characters)
    LengthBetween { min: Option<u64>, max: Option<u64> },
    /// String must match the regular expression
    Pattern(Pattern),
    /// Number of list items or map entries
    SizeBetween { min: Option<u64>, max: Option<u64> },
    /// List items must be distinct
    UniqueItems,
    /// Kubernetes object name (DNS-1123 subdomain)
    DnsSubdomainName,
    /// Kubernetes namespace name (DNS-1123 label)
    DnsLabelName,
    /// Label map: qualified keys, valid values
    Labels,
    /// Annotation map: qualified keys, bounded total size
    Annotations,
    /// Validators applied to every list element or map value
    Each(Vec<Validator>),
}

impl Validator {
    /// Check a value; returns a human-readable reason on failure
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::OneOf(allowed) => {
                if allowed.iter().any(|a| values_equal(a, value)) {
                    Ok(())
                } else {
                    Err(format!(
                        "value must be one of: {}, got: {}",
                        allowed
                            .iter()
                            .map(Value::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                        value
                    ))
                }
            }
            Self::NumberBetween {
                min,
                max,
                exclusive_min,
                exclusive_max,
            } => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                if let Some(min) = min {
                    let ok = if *exclusive_min { n > *min } else { n >= *min };
                    if !ok {
                        let op = if *exclusive_min { "greater than" } else { "at least" };
                        return Err(format!("value must be {} {}, got: {}", op, min, n));
                    }
                }
                if let Some(max) = max {
                    let ok = if *exclusive_max { n < *max } else { n <= *max };
                    if !ok {
                        let op = if *exclusive_max { "less than" } else { "at most" };
                        return Err(format!("value must be {} {}, got: {}", op, max, n));
                    }
                }
                Ok(())
            }
            Self::MultipleOf(factor) => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                let quotient = n / factor;
                if (quotient - quotient.round()).abs() < 1e-9 {
                    Ok(())
                } else {
                    Err(format!("value must be a multiple of {}, got: {}", factor, n))
                }
            }
            Self::LengthBetween { min, max } => {
                let Some(s) = value.as_str() else {
                    return Ok(());
                };
                check_bounds(s.chars().count() as u64, *min, *max, "string length")
            }
            Self::Pattern(pattern) => {
                let Some(s) = value.as_str() else {
                    return Ok(());
                };
                if pattern.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("value must match pattern '{}', got: '{}'", pattern, s))
                }
            }
            Self::SizeBetween { min, max } => {
                let size = match value {
                    Value::Array(items) => items.len(),
                    Value::Object(entries) => entries.len(),
                    _ => return Ok(()),
                };
                check_bounds(size as u64, *min, *max, "number of elements")
            }
            Self::UniqueItems => {
                let Some(items) = value.as_array() else {
                    return Ok(());
                };
                for (i, item) in items.iter().enumerate() {
                    if items[..i].iter().any(|other| values_equal(other, item)) {
                        return Err(format!("list elements must be unique, duplicate: {}", item));
                    }
                }
                Ok(())
            }
            Self::DnsSubdomainName => value
                .as_str()
                .map_or(Ok(()), |s| validate_dns_subdomain(s)),
            Self::DnsLabelName => value.as_str().map_or(Ok(()), |s| validate_dns_label(s)),
            Self::Labels => {
                let Some(labels) = value.as_object() else {
                    return Ok(());
                };
                for (key, val) in labels {
                    validate_qualified_name(key)
                        .map_err(|e| format!("invalid label key '{}': {}", key, e))?;
                    if let Some(v) = val.as_str() {
                        validate_label_value(v)
                            .map_err(|e| format!("invalid value for label '{}': {}", key, e))?;
                    }
                }
                Ok(())
            }
            Self::Annotations => {
                let Some(annotations) = value.as_object() else {
                    return Ok(());
                };
                let mut total = 0usize;
                for (key, val) in annotations {
                    validate_qualified_name(&key.to_lowercase())
                        .map_err(|e| format!("invalid annotation key '{}': {}", key, e))?;
                    total += key.len() + val.as_str().map_or(0, str::len);
                }
                if total > TOTAL_ANNOTATION_SIZE_LIMIT {
                    return Err(format!(
                        "annotations size {} exceeds the limit of {} bytes",
                        total, TOTAL_ANNOTATION_SIZE_LIMIT
                    ));
                }
                Ok(())
            }
            Self::Each(inner) => {
                let items: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(entries) => entries.values().collect(),
                    _ => return Ok(()),
                };
                for item in items.into_iter().filter(|i| !i.is_null()) {
                    for validator in inner {
                        validator
                            .validate(item)
                            .map_err(|e| format!("invalid element {}: {}", item, e))?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Check that the validator itself is well formed for the given type
    pub fn check_definition(&self, type_: &AttributeType) -> Result<(), String> {
        let scalar = matches!(
            type_,
            AttributeType::String | AttributeType::Int64 | AttributeType::Float64 | AttributeType::Bool
        );
        let numeric = matches!(type_, AttributeType::Int64 | AttributeType::Float64);
        let string_map = matches!(type_, AttributeType::Map(inner) if **inner == AttributeType::String);

        match self {
            Self::OneOf(values) if values.is_empty() => Err("enum has no values".to_string()),
            Self::OneOf(_) if !scalar && *type_ != AttributeType::Dynamic => {
                Err(format!("enum validator on {} attribute", type_))
            }
            Self::NumberBetween { min, max, .. } => {
                if !numeric && *type_ != AttributeType::Dynamic {
                    return Err(format!("numeric bounds on {} attribute", type_));
                }
                ordered(min.as_ref(), max.as_ref())
            }
            Self::MultipleOf(factor) if *factor <= 0.0 => {
                Err(format!("multipleOf must be positive, got {}", factor))
            }
            Self::MultipleOf(_) if !numeric => Err(format!("multipleOf on {} attribute", type_)),
            Self::LengthBetween { min, max } => {
                if *type_ != AttributeType::String && *type_ != AttributeType::Dynamic {
                    return Err(format!("length bounds on {} attribute", type_));
                }
                ordered(min.as_ref(), max.as_ref())
            }
            Self::SizeBetween { min, max } => {
                if !matches!(
                    type_,
                    AttributeType::List(_) | AttributeType::Map(_) | AttributeType::Dynamic
                ) {
                    return Err(format!("size bounds on {} attribute", type_));
                }
                ordered(min.as_ref(), max.as_ref())
            }
            Self::UniqueItems if !matches!(type_, AttributeType::List(_)) => {
                Err(format!("uniqueItems on {} attribute", type_))
            }
            Self::DnsSubdomainName | Self::DnsLabelName if *type_ != AttributeType::String => {
                Err(format!("name validator on {} attribute", type_))
            }
            Self::Labels | Self::Annotations if !string_map => {
                Err(format!("label/annotation validator on {} attribute", type_))
            }
            Self::Each(inner) => match type_ {
                AttributeType::List(element) | AttributeType::Map(element) => inner
                    .iter()
                    .try_for_each(|v| v.check_definition(element)),
                _ => Err(format!("element validator on {} attribute", type_)),
            },
            _ => Ok(()),
        }
    }

    /// Short description used in schema listings
    pub fn describe(&self) -> String {
        match self {
            Self::OneOf(values) => format!(
                "one of [{}]",
                values
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::NumberBetween { min, max, .. } => {
                format!("between {} and {}", bound(*min), bound(*max))
            }
            Self::MultipleOf(factor) => format!("multiple of {}", factor),
            Self::LengthBetween { min, max } => format!(
                "length between {} and {}",
                bound(min.map(|m| m as f64)),
                bound(max.map(|m| m as f64))
            ),
            Self::Pattern(pattern) => format!("matches /{}/", pattern),
            Self::SizeBetween { min, max } => format!(
                "size between {} and {}",
                bound(min.map(|m| m as f64)),
                bound(max.map(|m| m as f64))
            ),
            Self::UniqueItems => "unique items".to_string(),
            Self::DnsSubdomainName => "DNS-1123 subdomain".to_string(),
            Self::DnsLabelName => "DNS-1123 label".to_string(),
            Self::Labels => "Kubernetes labels".to_string(),
            Self::Annotations => "Kubernetes annotations".to_string(),
            Self::Each(inner) => format!(
                "each element {}",
                inner.iter().map(Validator::describe).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

fn bound(value: Option<f64>) -> String {
    value.map_or_else(|| "*".to_string(), |v| v.to_string())
}

fn ordered<T: PartialOrd + std::fmt::Display>(min: Option<&T>, max: Option<&T>) -> Result<(), String> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => {
            Err(format!("minimum {} is greater than maximum {}", min, max))
        }
        _ => Ok(()),
    }
}

fn check_bounds(actual: u64, min: Option<u64>, max: Option<u64>, what: &str) -> Result<(), String> {
    if let Some(min) = min {
        if actual < min {
            return Err(format!("{} must be at least {}, got: {}", what, min, actual));
        }
    }
    if let Some(max) = max {
        if actual > max {
            return Err(format!("{} must be at most {}, got: {}", what, max, actual));
        }
    }
    Ok(())
}

/// Compare JSON values, treating numerically equal integers and floats as equal
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

/// Validate a Kubernetes object name
pub fn validate_dns_subdomain(value: &str) -> Result<(), String> {
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        return Err(format!(
            "must be no more than {} characters",
            DNS1123_SUBDOMAIN_MAX_LENGTH
        ));
    }
    if !DNS1123_SUBDOMAIN.is_match(value) {
        return Err(format!(
            "'{}' must consist of lower case alphanumeric characters, '-' or '.', \
             and must start and end with an alphanumeric character",
            value
        ));
    }
    Ok(())
}

/// Validate a Kubernetes namespace name
pub fn validate_dns_label(value: &str) -> Result<(), String> {
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        return Err(format!(
            "must be no more than {} characters",
            DNS1123_LABEL_MAX_LENGTH
        ));
    }
    if !DNS1123_LABEL.is_match(value) {
        return Err(format!(
            "'{}' must consist of lower case alphanumeric characters or '-', \
             and must start and end with an alphanumeric character",
            value
        ));
    }
    Ok(())
}

/// Validate a qualified name (`[prefix/]name`) as used by label and annotation keys
pub fn validate_qualified_name(value: &str) -> Result<(), String> {
    let (prefix, name) = match value.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err("prefix part must be non-empty".to_string());
        }
        validate_dns_subdomain(prefix).map_err(|e| format!("prefix part {}", e))?;
    }

    if name.is_empty() {
        return Err("name part must be non-empty".to_string());
    }
    if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        return Err(format!(
            "name part must be no more than {} characters",
            QUALIFIED_NAME_MAX_LENGTH
        ));
    }
    if !QUALIFIED_NAME.is_match(name) {
        return Err(
            "name part must consist of alphanumeric characters, '-', '_' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

/// Validate a label value (may be empty)
pub fn validate_label_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > QUALIFIED_NAME_MAX_LENGTH {
        return Err(format!(
            "must be no more than {} characters",
            QUALIFIED_NAME_MAX_LENGTH
        ));
    }
    if !QUALIFIED_NAME.is_match(value) {
        return Err(
            "must consist of alphanumeric characters, '-', '_' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

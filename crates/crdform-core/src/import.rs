//! Import identifiers (`namespace/name`) and resource ids (`name/namespace`)

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::resource::keys;

/// Parsed `namespace/name` import identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub namespace: String,
    pub name: String,
}

impl ImportId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// State holding only the identity; everything else comes from a read
    pub fn seed_state(&self) -> Value {
        let mut metadata = Map::new();
        metadata.insert(keys::NAMESPACE.to_string(), Value::String(self.namespace.clone()));
        metadata.insert(keys::NAME.to_string(), Value::String(self.name.clone()));

        let mut state = Map::new();
        state.insert(keys::METADATA.to_string(), Value::Object(metadata));
        Value::Object(state)
    }

    /// Identity of the imported object as a resource id
    pub fn resource_id(&self) -> String {
        resource_id(&self.name, &self.namespace)
    }
}

impl FromStr for ImportId {
    type Err = CoreError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidImportId { id: id.to_string() };

        let mut parts = id.split('/');
        let (Some(namespace), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        if namespace.is_empty() || name.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(namespace, name))
    }
}

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Resource id stored in state: `name/namespace`
pub fn resource_id(name: &str, namespace: &str) -> String {
    format!("{}/{}", name, namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse() {
        let id: ImportId = "default/mygroup".parse().unwrap();
        assert_eq!(id.namespace, "default");
        assert_eq!(id.name, "mygroup");
        assert_eq!(id.to_string(), "default/mygroup");
        assert_eq!(id.resource_id(), "mygroup/default");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for bad in ["name", "a/b/c", "/name", "ns/", "", "/", "//"] {
            let err = bad.parse::<ImportId>().unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidImportId { ref id } if id == bad),
                "{:?} should be rejected",
                bad
            );
            assert!(err.to_string().contains("'namespace/name'"));
        }
    }

    #[test]
    fn test_seed_state() {
        let id = ImportId::new("emissary", "emissary-https");
        assert_eq!(
            id.seed_state(),
            json!({"metadata": {"namespace": "emissary", "name": "emissary-https"}})
        );
    }
}

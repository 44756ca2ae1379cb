//! CRD YAML parser
//!
//! Parses CustomResourceDefinition manifests into structured `CrdSchema`.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::schema::{Constraints, CrdNames, CrdSchema, CrdScope, CrdVersionSchema, PropertyType, SchemaProperty};
use crate::error::{CoreError, Result};

const CRD_KIND: &str = "CustomResourceDefinition";

/// Parser for CRD YAML manifests
pub struct CrdParser;

impl CrdParser {
    /// Parse a single CRD YAML manifest into a structured schema
    pub fn parse(yaml: &str) -> Result<CrdSchema> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::invalid_crd(format!("invalid CRD YAML: {}", e)))?;

        Self::parse_value(&value)
    }

    /// Parse every CRD in a multi-document YAML (or JSON) stream
    ///
    /// Documents that are not CustomResourceDefinitions are skipped, so CRD
    /// bundles that also carry namespaces or RBAC can be loaded as-is.
    pub fn parse_documents(content: &str) -> Result<Vec<CrdSchema>> {
        let mut crds = Vec::new();

        for document in serde_yaml::Deserializer::from_str(content) {
            let value = Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }

            let kind = value.get("kind").and_then(Value::as_str);
            if kind != Some(CRD_KIND) {
                let kind = kind.unwrap_or("<none>");
                tracing::debug!(kind, "skipping non-CRD document");
                continue;
            }

            crds.push(Self::parse_value(&value)?);
        }

        Ok(crds)
    }

    /// Parse from a serde_json::Value (useful for objects fetched from a cluster)
    pub fn parse_value(value: &Value) -> Result<CrdSchema> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_crd("missing 'kind' field"))?;

        if kind != CRD_KIND {
            return Err(CoreError::invalid_crd(format!(
                "expected CustomResourceDefinition, got {}",
                kind
            )));
        }

        let name = value
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_crd("missing 'metadata.name' field"))?
            .to_string();

        let spec = value
            .get("spec")
            .ok_or_else(|| CoreError::invalid_crd("missing 'spec' field"))?;

        let group = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_crd("missing 'spec.group' field"))?
            .to_string();

        let scope = CrdScope::from_spec(spec.get("scope").and_then(Value::as_str));

        let names = Self::parse_names(spec.get("names"))?;
        let versions = Self::parse_versions(spec.get("versions"))?;

        Ok(CrdSchema {
            name,
            group,
            scope,
            names,
            versions,
        })
    }

    fn parse_names(names_value: Option<&Value>) -> Result<CrdNames> {
        let names =
            names_value.ok_or_else(|| CoreError::invalid_crd("missing 'spec.names' field"))?;

        let kind = names
            .get("kind")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::invalid_crd("missing 'spec.names.kind' field"))?;

        let plural = names
            .get("plural")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::invalid_crd("missing 'spec.names.plural' field"))?;

        Ok(CrdNames {
            kind: kind.to_string(),
            plural: plural.to_string(),
        })
    }

    fn parse_versions(versions_value: Option<&Value>) -> Result<Vec<CrdVersionSchema>> {
        let versions = versions_value
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::invalid_crd("missing 'spec.versions' array"))?;

        versions.iter().map(Self::parse_version).collect()
    }

    fn parse_version(version: &Value) -> Result<CrdVersionSchema> {
        let name = version
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_crd("version missing 'name' field"))?
            .to_string();

        let served = version
            .get("served")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let deprecated = version
            .get("deprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let deprecation_warning = version
            .get("deprecationWarning")
            .and_then(Value::as_str)
            .map(String::from);

        let root = version
            .pointer("/schema/openAPIV3Schema")
            .map(|node| Self::parse_schema_property(node, &name));

        Ok(CrdVersionSchema {
            name,
            served,
            deprecated,
            deprecation_warning,
            root,
        })
    }

    /// Parse an OpenAPI node and everything below it
    fn parse_schema_property(node: &Value, version: &str) -> SchemaProperty {
        let properties: BTreeMap<_, _> = node
            .get("properties")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::parse_schema_property(v, version)))
                    .collect()
            })
            .unwrap_or_default();

        let type_ = match node.get("type").and_then(Value::as_str) {
            Some(t) => PropertyType::parse(t),
            // Untyped nodes with nested properties are still objects
            None if !properties.is_empty() => PropertyType::Object,
            None => PropertyType::Unknown,
        };

        // `additionalProperties: true|false` carries no value schema
        let values = node
            .get("additionalProperties")
            .filter(|v| v.is_object())
            .map(|v| Box::new(Self::parse_schema_property(v, version)));

        let constraints = Constraints::deserialize(node).unwrap_or_else(|e| {
            tracing::warn!(version, "ignoring malformed validation keywords: {}", e);
            Constraints::default()
        });

        SchemaProperty {
            type_,
            description: node
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            has_default: node.get("default").is_some(),
            free_form: [
                "x-kubernetes-int-or-string",
                "x-kubernetes-preserve-unknown-fields",
                "x-kubernetes-embedded-resource",
            ]
            .iter()
            .any(|key| flag(node, key)),
            properties,
            required: string_list(node.get("required")),
            items: node
                .get("items")
                .map(|v| Box::new(Self::parse_schema_property(v, version))),
            values,
            constraints,
        }
    }
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: cacheparametergroups.elasticache.services.k8s.aws
spec:
  group: elasticache.services.k8s.aws
  scope: Namespaced
  names:
    kind: CacheParameterGroup
    plural: cacheparametergroups
    singular: cacheparametergroup
  versions:
    - name: v1alpha1
      served: true
      storage: true
      subresources:
        status: {}
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              required:
                - cacheParameterGroupFamily
                - cacheParameterGroupName
              properties:
                cacheParameterGroupFamily:
                  type: string
                  maxLength: 64
                cacheParameterGroupName:
                  type: string
                description:
                  type: string
                parameterNameValues:
                  type: array
                  maxItems: 20
                  items:
                    type: object
                    properties:
                      parameterName:
                        type: string
                      parameterValue:
                        type: string
                tags:
                  type: array
                  items:
                    type: object
                    properties:
                      key:
                        type: string
                      value:
                        type: string
            status:
              type: object
              properties:
                conditions:
                  type: array
                  items:
                    type: object
                    x-kubernetes-preserve-unknown-fields: true
    - name: v1alpha0
      served: false
      storage: false
      deprecated: true
      deprecationWarning: "v1alpha0 is gone"
      schema:
        openAPIV3Schema:
          type: object
"#;

    #[test]
    fn test_parse_crd() {
        let schema = CrdParser::parse(SAMPLE_CRD).unwrap();

        assert_eq!(
            schema.name,
            "cacheparametergroups.elasticache.services.k8s.aws"
        );
        assert_eq!(schema.group, "elasticache.services.k8s.aws");
        assert_eq!(schema.scope, CrdScope::Namespaced);
        assert_eq!(schema.names.kind, "CacheParameterGroup");
        assert_eq!(schema.names.plural, "cacheparametergroups");
        assert_eq!(schema.versions.len(), 2);
    }

    #[test]
    fn test_parse_versions() {
        let schema = CrdParser::parse(SAMPLE_CRD).unwrap();

        let current = &schema.versions[0];
        assert_eq!(current.name, "v1alpha1");
        assert!(current.served);
        assert!(!current.deprecated);

        let old = &schema.versions[1];
        assert!(!old.served);
        assert!(old.deprecated);
        assert_eq!(old.deprecation_warning.as_deref(), Some("v1alpha0 is gone"));
    }

    #[test]
    fn test_parse_schema_properties() {
        let schema = CrdParser::parse(SAMPLE_CRD).unwrap();
        let version = &schema.versions[0];

        let spec = version.spec_schema().unwrap();
        assert!(spec.is_required("cacheParameterGroupFamily"));
        assert!(!spec.is_required("description"));

        let family = spec.property("cacheParameterGroupFamily").unwrap();
        assert_eq!(family.type_, PropertyType::String);
        assert_eq!(family.constraints.max_length, Some(64));

        let params = spec.property("parameterNameValues").unwrap();
        assert_eq!(params.type_, PropertyType::Array);
        assert_eq!(params.constraints.max_items, Some(20));
        let item = params.items.as_ref().unwrap();
        assert!(item.property("parameterName").is_some());

        let status = version.status_schema().unwrap();
        let conditions = status.property("conditions").unwrap();
        assert!(conditions.items.as_ref().unwrap().free_form);
        assert!(!conditions.free_form);
    }

    #[test]
    fn test_parse_invalid_kind() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: test
"#;
        let err = CrdParser::parse(yaml).unwrap_err();
        assert!(
            err.to_string()
                .contains("expected CustomResourceDefinition")
        );
    }

    #[test]
    fn test_parse_missing_plural() {
        let yaml = r#"
kind: CustomResourceDefinition
metadata:
  name: things.example.com
spec:
  group: example.com
  names:
    kind: Thing
  versions: []
"#;
        let err = CrdParser::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("spec.names.plural"));
    }

    #[test]
    fn test_parse_cluster_scope() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: coreproviders.operator.cluster.x-k8s.io
spec:
  group: operator.cluster.x-k8s.io
  scope: Cluster
  names:
    kind: CoreProvider
    plural: coreproviders
  versions:
    - name: v1alpha2
      served: true
      storage: true
"#;
        let schema = CrdParser::parse(yaml).unwrap();
        assert_eq!(schema.scope, CrdScope::Cluster);
        assert!(schema.versions[0].root.is_none());
    }

    #[test]
    fn test_parse_documents_skips_other_kinds() {
        let bundle = format!(
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: ack-system\n---\n{}\n---\n",
            SAMPLE_CRD.trim()
        );
        let crds = CrdParser::parse_documents(&bundle).unwrap();
        assert_eq!(crds.len(), 1);
        assert_eq!(crds[0].names.kind, "CacheParameterGroup");
    }

    #[test]
    fn test_parse_exclusive_bounds_and_untyped_nodes() {
        let yaml = r#"
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  names:
    kind: Widget
    plural: widgets
  versions:
    - name: v1
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              properties:
                ratio:
                  type: number
                  minimum: 0
                  exclusiveMinimum: true
                port:
                  x-kubernetes-int-or-string: true
"#;
        let schema = CrdParser::parse(yaml).unwrap();
        let spec = schema.versions[0].spec_schema().unwrap();
        assert_eq!(spec.type_, PropertyType::Object);

        let ratio = spec.property("ratio").unwrap();
        assert_eq!(ratio.constraints.minimum, Some(0.0));
        assert!(ratio.constraints.exclusive_minimum);

        let port = spec.property("port").unwrap();
        assert!(port.free_form);
        assert_eq!(port.type_, PropertyType::Unknown);
    }
}

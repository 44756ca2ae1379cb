//! Conversion between Terraform-style state and Kubernetes objects
//!
//! State is a JSON object keyed by snake_case attribute names; Kubernetes
//! objects use the camelCase JSON names recorded on each [`Attribute`].
//! Only `metadata`, `spec` and (read direction) `status` travel between the
//! two; `apiVersion`/`kind` are always stamped from the schema.

use serde_json::{Map, Value};

use crate::attribute::{AttributeType, ObjectType, as_integer};
use crate::diagnostics::AttributePath;
use crate::error::{CoreError, Result};
use crate::resource::{ResourceSchema, keys};

/// Root attributes carried into the Kubernetes object
const OBJECT_ROOTS: &[&str] = &[keys::METADATA, keys::SPEC];

/// Build the Kubernetes object for a state or plan value
pub fn state_to_object(schema: &ResourceSchema, state: &Value) -> Result<Value> {
    let state = state
        .as_object()
        .ok_or_else(|| CoreError::marshal(AttributePath::root(), "state must be an object"))?;

    let mut object = Map::new();
    object.insert("apiVersion".to_string(), Value::String(schema.api.api_version()));
    object.insert("kind".to_string(), Value::String(schema.api.kind.clone()));

    for &name in OBJECT_ROOTS {
        let Some(attribute) = schema.attributes.get(name) else {
            continue;
        };
        let Some(value) = state.get(name).filter(|v| !v.is_null()) else {
            continue;
        };
        let path = AttributePath::attribute(name);
        if let Some(converted) = to_kubernetes(&attribute.type_, value, &path)? {
            object.insert(attribute.json_name.clone(), converted);
        }
    }

    Ok(Value::Object(object))
}

/// Build state from a Kubernetes object
///
/// Starts from `prior` (when given) so identity and adapter settings survive;
/// `metadata` fields the schema knows, `spec` and `status` are replaced by the
/// object's values while `metadata.name`/`metadata.namespace` already present
/// in `prior` are kept.
pub fn object_to_state(schema: &ResourceSchema, object: &Value, prior: Option<&Value>) -> Result<Value> {
    let fields = object
        .as_object()
        .ok_or_else(|| CoreError::unmarshal(AttributePath::root(), "object must be a JSON object"))?;

    let mut state = match prior {
        Some(Value::Object(prior)) => prior.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(_) => return Err(CoreError::unmarshal(AttributePath::root(), "prior state must be an object")),
    };

    if let Some(api_version) = fields.get("apiVersion").and_then(Value::as_str) {
        if api_version != schema.api.api_version() {
            return Err(CoreError::unmarshal(
                "apiVersion",
                format!("expected '{}', got '{}'", schema.api.api_version(), api_version),
            ));
        }
    }
    if let Some(kind) = fields.get("kind").and_then(Value::as_str) {
        if kind != schema.api.kind {
            return Err(CoreError::unmarshal(
                "kind",
                format!("expected '{}', got '{}'", schema.api.kind, kind),
            ));
        }
    }
    state.insert(keys::API_VERSION.to_string(), Value::String(schema.api.api_version()));
    state.insert(keys::KIND.to_string(), Value::String(schema.api.kind.clone()));

    for name in [keys::METADATA, keys::SPEC, keys::STATUS] {
        let Some(attribute) = schema.attributes.get(name) else {
            continue;
        };
        let path = AttributePath::attribute(name);
        let converted = match fields.get(&attribute.json_name) {
            Some(value) => from_kubernetes(&attribute.type_, value, &path)?,
            None => None,
        };

        if name == keys::METADATA {
            let identity = state.get(name).cloned();
            let mut metadata = match converted {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            for key in [keys::NAME, keys::NAMESPACE] {
                if let Some(value) = identity.as_ref().and_then(|m| m.get(key)).filter(|v| !v.is_null()) {
                    metadata.insert(key.to_string(), value.clone());
                }
            }
            state.insert(name.to_string(), Value::Object(metadata));
        } else {
            match converted {
                Some(value) => state.insert(name.to_string(), value),
                None => state.remove(name),
            };
        }
    }

    Ok(Value::Object(state))
}

fn to_kubernetes(type_: &AttributeType, value: &Value, path: &AttributePath) -> Result<Option<Value>> {
    if value.is_null() {
        return Ok(None);
    }
    if !type_.accepts(value) {
        return Err(CoreError::marshal(path, mismatch(type_, value)));
    }

    let converted = match type_ {
        AttributeType::Int64 => as_integer(value).map(Value::from).unwrap_or(Value::Null),
        AttributeType::String | AttributeType::Float64 | AttributeType::Bool | AttributeType::Dynamic => {
            value.clone()
        }
        AttributeType::List(element) => {
            let mut items = Vec::new();
            for (i, item) in value.as_array().into_iter().flatten().enumerate() {
                items.push(to_kubernetes(element, item, &path.index(i))?.unwrap_or(Value::Null));
            }
            Value::Array(items)
        }
        AttributeType::Map(element) => {
            let mut entries = Map::new();
            for (key, item) in value.as_object().into_iter().flatten() {
                if let Some(converted) = to_kubernetes(element, item, &path.key(key.as_str()))? {
                    entries.insert(key.clone(), converted);
                }
            }
            Value::Object(entries)
        }
        AttributeType::Object(object) => {
            let mut fields = Map::new();
            for (name, item) in value.as_object().into_iter().flatten() {
                let attribute = object.get(name).ok_or_else(|| {
                    CoreError::marshal(path.child(name.as_str()), "unsupported attribute")
                })?;
                if let Some(converted) = to_kubernetes(&attribute.type_, item, &path.child(name.as_str()))? {
                    fields.insert(attribute.json_name.clone(), converted);
                }
            }
            Value::Object(fields)
        }
    };

    Ok(Some(converted))
}

fn from_kubernetes(type_: &AttributeType, value: &Value, path: &AttributePath) -> Result<Option<Value>> {
    if value.is_null() {
        return Ok(None);
    }
    if !type_.accepts(value) {
        return Err(CoreError::unmarshal(path, mismatch(type_, value)));
    }

    let converted = match type_ {
        AttributeType::Int64 => as_integer(value).map(Value::from).unwrap_or(Value::Null),
        AttributeType::String | AttributeType::Float64 | AttributeType::Bool | AttributeType::Dynamic => {
            value.clone()
        }
        AttributeType::List(element) => {
            let mut items = Vec::new();
            for (i, item) in value.as_array().into_iter().flatten().enumerate() {
                items.push(from_kubernetes(element, item, &path.index(i))?.unwrap_or(Value::Null));
            }
            Value::Array(items)
        }
        AttributeType::Map(element) => {
            let mut entries = Map::new();
            for (key, item) in value.as_object().into_iter().flatten() {
                if let Some(converted) = from_kubernetes(element, item, &path.key(key.as_str()))? {
                    entries.insert(key.clone(), converted);
                }
            }
            Value::Object(entries)
        }
        AttributeType::Object(object) => object_from_kubernetes(object, value, path)?,
    };

    Ok(Some(converted))
}

/// Fields the schema does not declare (uid, managedFields, ...) are dropped
fn object_from_kubernetes(object: &ObjectType, value: &Value, path: &AttributePath) -> Result<Value> {
    let mut state = Map::new();
    let Some(fields) = value.as_object() else {
        return Ok(Value::Object(state));
    };

    for (name, attribute) in object.iter() {
        if let Some(item) = fields.get(&attribute.json_name) {
            if let Some(converted) = from_kubernetes(&attribute.type_, item, &path.child(name.as_str()))? {
                state.insert(name.clone(), converted);
            }
        }
    }
    Ok(Value::Object(state))
}

fn mismatch(type_: &AttributeType, value: &Value) -> String {
    format!("expected {}, got {}", type_, json_type(value))
}

/// JSON type name of a value, for messages
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Remove null object members recursively
///
/// Absent and null attributes are equivalent in state; comparisons go
/// through this.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

/// Read a string at a dotted path of a state value
pub fn get_str<'a>(state: &'a Value, path: &str) -> Option<&'a str> {
    path.split('.')
        .try_fold(state, |current, key| current.get(key))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::CrdParser;
    use crate::diagnostics::Diagnostics;
    use crate::resource::Variant;
    use serde_json::json;

    const ELASTICACHE: &str = include_str!("../../../fixtures/crds/elasticache-cacheparametergroups.yaml");
    const CORE_PROVIDER: &str = include_str!("../../../fixtures/crds/operator-coreproviders.yaml");

    fn schema(crd: &str, variant: Variant) -> ResourceSchema {
        let crd = CrdParser::parse(crd).unwrap();
        let mut warnings = Diagnostics::new();
        ResourceSchema::from_crd("k8s", &crd, &crd.versions[0], variant, &mut warnings).unwrap()
    }

    fn plan() -> Value {
        json!({
            "metadata": {
                "name": "mygroup",
                "namespace": "default",
                "labels": {"team": "cache"},
                "annotations": null
            },
            "spec": {
                "cache_parameter_group_family": "redis6.x",
                "cache_parameter_group_name": "mygroup",
                "description": "test",
                "parameter_name_values": [
                    {"parameter_name": "maxmemory-policy", "parameter_value": "allkeys-lru"}
                ],
                "tags": null
            },
            "field_manager": "team-cache",
            "wait_for": []
        })
    }

    #[test]
    fn test_state_to_object() {
        let schema = schema(ELASTICACHE, Variant::Resource);
        let object = state_to_object(&schema, &plan()).unwrap();

        assert_eq!(
            object,
            json!({
                "apiVersion": "elasticache.services.k8s.aws/v1alpha1",
                "kind": "CacheParameterGroup",
                "metadata": {
                    "name": "mygroup",
                    "namespace": "default",
                    "labels": {"team": "cache"}
                },
                "spec": {
                    "cacheParameterGroupFamily": "redis6.x",
                    "cacheParameterGroupName": "mygroup",
                    "description": "test",
                    "parameterNameValues": [
                        {"parameterName": "maxmemory-policy", "parameterValue": "allkeys-lru"}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_state_to_object_type_mismatch() {
        let schema = schema(ELASTICACHE, Variant::Resource);
        let mut plan = plan();
        plan["spec"]["description"] = json!(42);

        let err = state_to_object(&schema, &plan).unwrap_err();
        assert!(matches!(err, CoreError::Marshal { ref path, .. } if path == "spec.description"));
        assert!(err.to_string().contains("expected string, got integer"));
    }

    #[test]
    fn test_state_to_object_unknown_attribute() {
        let schema = schema(ELASTICACHE, Variant::Resource);
        let mut plan = plan();
        plan["spec"]["descripton"] = json!("typo");

        let err = state_to_object(&schema, &plan).unwrap_err();
        assert!(err.to_string().contains("spec.descripton"));
    }

    #[test]
    fn test_object_to_state_drops_server_fields() {
        let schema = schema(ELASTICACHE, Variant::Resource);
        let response = json!({
            "apiVersion": "elasticache.services.k8s.aws/v1alpha1",
            "kind": "CacheParameterGroup",
            "metadata": {
                "name": "mygroup",
                "namespace": "default",
                "uid": "0b9c5e0e-8f0c-4a39-9f1a-1e2d3c4b5a69",
                "resourceVersion": "4242",
                "managedFields": []
            },
            "spec": {
                "cacheParameterGroupFamily": "redis6.x",
                "cacheParameterGroupName": "mygroup",
                "description": "test"
            },
            "status": {"ackResourceMetadata": {"region": "eu-west-1"}}
        });

        let state = object_to_state(&schema, &response, None).unwrap();
        assert_eq!(state["api_version"], "elasticache.services.k8s.aws/v1alpha1");
        assert_eq!(state["kind"], "CacheParameterGroup");
        assert_eq!(state["metadata"], json!({"name": "mygroup", "namespace": "default"}));
        assert_eq!(state["spec"]["cache_parameter_group_family"], "redis6.x");
        // resource schemas carry no status
        assert!(state.get("status").is_none());
    }

    #[test]
    fn test_object_to_state_preserves_identity_and_knobs() {
        let schema = schema(ELASTICACHE, Variant::Resource);
        let prior = json!({
            "id": "mygroup/default",
            "metadata": {"name": "mygroup", "namespace": "default"},
            "force_conflicts": true
        });
        let response = json!({
            "metadata": {"name": "other", "namespace": "elsewhere", "labels": {"a": "b"}},
            "spec": {"cacheParameterGroupFamily": "redis7"}
        });

        let state = object_to_state(&schema, &response, Some(&prior)).unwrap();
        assert_eq!(state["id"], "mygroup/default");
        assert_eq!(state["force_conflicts"], true);
        assert_eq!(state["metadata"]["name"], "mygroup");
        assert_eq!(state["metadata"]["namespace"], "default");
        assert_eq!(state["metadata"]["labels"]["a"], "b");
    }

    #[test]
    fn test_object_to_state_mismatch() {
        let schema = schema(ELASTICACHE, Variant::Resource);
        let response = json!({
            "metadata": {"name": "mygroup", "namespace": "default"},
            "spec": {"parameterNameValues": {"not": "a list"}}
        });
        let err = object_to_state(&schema, &response, None).unwrap_err();
        assert!(matches!(err, CoreError::Unmarshal { ref path, .. } if path == "spec.parameter_name_values"));

        let wrong_kind = json!({"kind": "Listener"});
        assert!(object_to_state(&schema, &wrong_kind, None).is_err());
    }

    #[test]
    fn test_round_trip() {
        let schema = schema(CORE_PROVIDER, Variant::Resource);
        let plan = json!({
            "metadata": {"name": "cluster-api", "namespace": "capi-system"},
            "spec": {
                "version": "v1.7.0",
                "config_secret": {"name": "credentials", "namespace": null},
                "deployment": {
                    "replicas": 2,
                    "node_selector": {"kubernetes.io/os": "linux"},
                    "containers": [
                        {"name": "manager", "args": {"--v": "5"}, "resources": {"limits": {"cpu": "500m"}}}
                    ]
                },
                "manager": {
                    "max_concurrent_reconciles": 4,
                    "feature_gates": {"MachinePool": true, "ClusterTopology": false}
                },
                "fetch_config": {"selector": {"match_labels": {"provider": "core"}}}
            }
        });

        let object = state_to_object(&schema, &plan).unwrap();
        assert_eq!(object["spec"]["deployment"]["nodeSelector"]["kubernetes.io/os"], "linux");
        assert_eq!(object["spec"]["manager"]["featureGates"]["MachinePool"], true);

        let state = object_to_state(&schema, &object, None).unwrap();
        assert_eq!(normalize(&state["spec"]), normalize(&plan["spec"]));
        assert_eq!(state["metadata"], plan["metadata"]);
    }

    #[test]
    fn test_data_source_status() {
        let schema = schema(CORE_PROVIDER, Variant::DataSource);
        let object = json!({
            "metadata": {"name": "cluster-api", "namespace": "capi-system"},
            "spec": {"version": "v1.7.0"},
            "status": {
                "installedVersion": "v1.7.0",
                "observedGeneration": 3,
                "conditions": [{"type": "Ready", "status": "True"}]
            }
        });
        let state = object_to_state(&schema, &object, None).unwrap();
        assert_eq!(state["status"]["installed_version"], "v1.7.0");
        assert_eq!(state["status"]["observed_generation"], 3);
        assert_eq!(state["status"]["conditions"][0]["type"], "Ready");
    }

    #[test]
    fn test_integer_floats_are_accepted() {
        let schema = schema(CORE_PROVIDER, Variant::Resource);
        let plan = json!({
            "metadata": {"name": "a", "namespace": "b"},
            "spec": {"deployment": {"replicas": 3.0}}
        });
        let object = state_to_object(&schema, &plan).unwrap();
        assert_eq!(object["spec"]["deployment"]["replicas"], json!(3));
    }

    #[test]
    fn test_normalize_and_get_str() {
        let value = json!({"a": null, "b": {"c": null, "d": "x"}, "e": [null]});
        assert_eq!(normalize(&value), json!({"b": {"d": "x"}, "e": [null]}));
        assert_eq!(get_str(&value, "b.d"), Some("x"));
        assert_eq!(get_str(&value, "b.c"), None);
    }
}

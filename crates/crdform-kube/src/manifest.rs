//! Offline manifest rendering
//!
//! The manifest variant never talks to a cluster: it validates the plan,
//! builds the object exactly as the resource adapter would send it, and
//! stores its YAML form in the computed `yaml` attribute.

use crdform_core::{Diagnostics, ResourceSchema, keys, validate_config};
use serde_json::Value;

use crate::adapter::{AdapterCore, stamp};
use crate::error::{AdapterError, Result};

#[derive(Clone)]
pub struct ManifestAdapter {
    core: AdapterCore,
}

impl ManifestAdapter {
    pub fn new(schema: ResourceSchema) -> Self {
        Self {
            core: AdapterCore::new(schema),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.core.schema.type_name
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.core.schema
    }

    pub fn validate(&self, config: &Value) -> Diagnostics {
        validate_config(&self.core.schema, config)
    }

    /// Render the plan; returns state with `yaml` set
    pub fn read(&self, plan: &Value) -> Result<Value> {
        self.core.check_plan(validate_config(&self.core.schema, plan))?;
        let mut state = stamp(&self.core.schema, plan, true)?;

        let yaml = self.render(&state)?;
        if let Value::Object(fields) = &mut state {
            fields.insert(keys::YAML.to_string(), Value::String(yaml));
        }
        Ok(state)
    }

    /// YAML form of the object a plan describes
    pub fn render(&self, plan: &Value) -> Result<String> {
        let object = self.core.to_object(plan)?;
        serde_yaml::to_string(&object).map_err(AdapterError::Render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdform_core::{Catalog, Variant};
    use serde_json::json;

    const CORE_PROVIDERS: &str = include_str!("../../../fixtures/crds/operator-coreproviders.yaml");
    const MANIFEST: &str = "k8s_operator_cluster_x_k8s_io_core_provider_v1alpha2_manifest";

    fn manifest() -> ManifestAdapter {
        let mut catalog = Catalog::default();
        catalog.add_documents(CORE_PROVIDERS).unwrap();
        ManifestAdapter::new(catalog.get(Variant::Manifest, MANIFEST).unwrap().clone())
    }

    #[test]
    fn test_render() {
        let plan = json!({
            "metadata": {"name": "cluster-api", "namespace": "capi-system"},
            "spec": {
                "config_secret": {"name": "capi-variables"},
                "version": "v1.7.0"
            }
        });

        let state = manifest().read(&plan).unwrap();
        assert_eq!(state["id"], "cluster-api/capi-system");
        assert_eq!(state["api_version"], "operator.cluster.x-k8s.io/v1alpha2");
        assert_eq!(state["kind"], "CoreProvider");

        insta::assert_snapshot!(state["yaml"].as_str().unwrap(), @r###"
        apiVersion: operator.cluster.x-k8s.io/v1alpha2
        kind: CoreProvider
        metadata:
          name: cluster-api
          namespace: capi-system
        spec:
          configSecret:
            name: capi-variables
          version: v1.7.0
        "###);
    }

    #[test]
    fn test_render_metadata_maps() {
        let plan = json!({
            "metadata": {
                "annotations": {"example.com/owner": "platform"},
                "labels": {"app.kubernetes.io/name": "cluster-api"},
                "name": "cluster-api",
                "namespace": "capi-system"
            },
            "spec": {"manager": {"feature_gates": {"ClusterTopology": true}}}
        });

        let yaml = manifest().render(&plan).unwrap();
        insta::assert_snapshot!(yaml, @r###"
        apiVersion: operator.cluster.x-k8s.io/v1alpha2
        kind: CoreProvider
        metadata:
          annotations:
            example.com/owner: platform
          labels:
            app.kubernetes.io/name: cluster-api
          name: cluster-api
          namespace: capi-system
        spec:
          manager:
            featureGates:
              ClusterTopology: true
        "###);
    }

    #[test]
    fn test_invalid_plan() {
        let plan = json!({"metadata": {"name": "cluster-api"}, "spec": {"version": 17}});

        let err = manifest().read(&plan).unwrap_err();
        let AdapterError::InvalidPlan { diagnostics, .. } = err else {
            panic!("expected InvalidPlan");
        };
        let summaries: Vec<&str> = diagnostics.errors().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"Missing required argument"));
        assert!(summaries.contains(&"Incorrect attribute value type"));
    }

    #[test]
    fn test_computed_attributes_rejected() {
        let plan = json!({
            "kind": "ClusterAPI",
            "metadata": {"name": "cluster-api", "namespace": "capi-system"},
            "spec": {"version": "v1.7.0"}
        });

        let err = manifest().read(&plan).unwrap_err();
        let AdapterError::InvalidPlan { diagnostics, .. } = err else {
            panic!("expected InvalidPlan");
        };
        let diag = diagnostics.errors().next().unwrap();
        assert_eq!(diag.summary, "Invalid configuration");
        assert_eq!(diag.path.as_ref().unwrap().to_string(), "kind");
    }
}

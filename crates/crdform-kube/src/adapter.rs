//! Generic adapter for one custom resource Kind
//!
//! A [`ResourceAdapter`] is driven entirely by its [`ResourceSchema`]: plans
//! are validated against it, converted to Kubernetes objects with it, and
//! responses are converted back through it. Every network operation is a
//! single call on the injected [`ResourceClient`].

use crdform_core::convert::get_str;
use crdform_core::{
    CoreError, Diagnostic, Diagnostics, ImportId, ResourceSchema, keys, object_to_state,
    resource_id, state_to_object, validate_config, validate_plan,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::client::{ApplyParams, ResourceClient};
use crate::config::{ProviderConfig, ProviderData};
use crate::diff::PlanDiff;
use crate::error::{AdapterError, ApiVerb, Result};
use crate::wait::{WaitCondition, WaitTarget, wait_for_conditions};

/// Schema, client handle and provider settings shared by the
/// resource and data source adapters
#[derive(Clone)]
pub(crate) struct AdapterCore {
    pub(crate) schema: ResourceSchema,
    client: Option<Arc<dyn ResourceClient>>,
    pub(crate) config: ProviderConfig,
}

impl AdapterCore {
    pub(crate) fn new(schema: ResourceSchema) -> Self {
        Self {
            schema,
            client: None,
            config: ProviderConfig::default(),
        }
    }

    pub(crate) fn configure(&mut self, data: Option<&ProviderData>) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let Some(data) = data else {
            return diags;
        };

        self.config = data.config.clone();
        if data.config.offline {
            self.client = None;
            diags.push(Diagnostic::error(
                "Provider in offline mode",
                format!(
                    "{} cannot reach a cluster while the provider is offline; only manifests can be rendered.",
                    self.schema.type_name
                ),
            ));
            return diags;
        }

        match &data.client {
            Some(client) => self.client = Some(Arc::clone(client)),
            None => diags.push(Diagnostic::error(
                "Unconfigured Kubernetes client",
                format!("no Kubernetes client was provided to {}", self.schema.type_name),
            )),
        }
        diags
    }

    pub(crate) fn client(&self, operation: &'static str) -> Result<&dyn ResourceClient> {
        if self.config.offline {
            return Err(AdapterError::Offline {
                type_name: self.schema.type_name.clone(),
                operation,
            });
        }
        self.client.as_deref().ok_or_else(|| AdapterError::NotConfigured {
            type_name: self.schema.type_name.clone(),
        })
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub(crate) fn check_plan(&self, diags: Diagnostics) -> Result<()> {
        if diags.has_error() {
            return Err(AdapterError::InvalidPlan {
                type_name: self.schema.type_name.clone(),
                diagnostics: diags,
            });
        }
        for warning in diags.warnings() {
            tracing::warn!(type_name = %self.schema.type_name, "{}", warning);
        }
        Ok(())
    }

    pub(crate) fn to_object(&self, state: &Value) -> Result<Value> {
        state_to_object(&self.schema, state).map_err(|source| AdapterError::Marshal {
            type_name: self.schema.type_name.clone(),
            source,
        })
    }

    pub(crate) fn to_state(&self, object: &Value, prior: &Value) -> Result<Value> {
        object_to_state(&self.schema, object, Some(prior)).map_err(|source| AdapterError::Unmarshal {
            type_name: self.schema.type_name.clone(),
            source,
        })
    }

    pub(crate) async fn get(&self, operation: &'static str, namespace: &str, name: &str) -> Result<Value> {
        let client = self.client(operation)?;
        client
            .get(&self.schema.api, namespace, name)
            .await
            .map_err(|e| AdapterError::from_api(ApiVerb::Get, &self.schema.api.kind, namespace, name, e))
    }
}

/// `metadata.namespace` and `metadata.name` of a plan or state
pub(crate) fn identity(state: &Value) -> Result<(String, String)> {
    let field = |key: &str| {
        let path = format!("{}.{}", keys::METADATA, key);
        get_str(state, &path)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(CoreError::MissingAttribute { path })
    };
    Ok((field(keys::NAMESPACE)?, field(keys::NAME)?))
}

/// Prior `id` and the planned one when the plan moves the object
///
/// Plans without an `id` have no prior identity and never move.
pub(crate) fn identity_change(plan: &Value) -> Result<Option<(String, String)>> {
    let Some(id) = plan.get(keys::ID).and_then(Value::as_str).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    let (namespace, name) = identity(plan)?;
    let planned = resource_id(&name, &namespace);
    Ok((id != planned).then(|| (id.to_string(), planned)))
}

/// Stamp `api_version`/`kind` and, when requested or absent, the `id`
pub(crate) fn stamp(schema: &ResourceSchema, state: &Value, synthesize_id: bool) -> Result<Value> {
    let mut fields = match state {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    fields.insert(keys::API_VERSION.to_string(), Value::String(schema.api.api_version()));
    fields.insert(keys::KIND.to_string(), Value::String(schema.api.kind.clone()));

    let has_id = fields.get(keys::ID).is_some_and(|v| !v.is_null());
    if synthesize_id || !has_id {
        let (namespace, name) = identity(state)?;
        fields.insert(keys::ID.to_string(), Value::String(resource_id(&name, &namespace)));
    }
    Ok(Value::Object(fields))
}

/// Managed resource adapter: create, read, update, delete and import
/// through server-side apply
#[derive(Clone)]
pub struct ResourceAdapter {
    core: AdapterCore,
}

impl ResourceAdapter {
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

    pub fn is_configured(&self) -> bool {
        self.core.is_configured()
    }

    /// Inject the provider's client and defaults
    ///
    /// `None` is accepted during validation and leaves the adapter untouched.
    pub fn configure(&mut self, data: Option<&ProviderData>) -> Diagnostics {
        self.core.configure(data)
    }

    /// Validate a user configuration
    pub fn validate(&self, config: &Value) -> Diagnostics {
        validate_config(&self.core.schema, config)
    }

    /// Create the object and return the new state
    ///
    /// The plan is user configuration: computed attributes must not be set.
    pub async fn create(&self, plan: &Value) -> Result<Value> {
        self.core.check_plan(validate_config(&self.core.schema, plan))?;
        let state = stamp(&self.core.schema, plan, true)?;
        tracing::info!(type_name = %self.type_name(), id = ?state.get(keys::ID), "creating");
        self.apply(state, "create").await
    }

    /// Refresh state from the cluster
    pub async fn read(&self, state: &Value) -> Result<Value> {
        let (namespace, name) = identity(state)?;
        let object = self.core.get("read", &namespace, &name).await?;
        let refreshed = self.core.to_state(&object, state)?;
        stamp(&self.core.schema, &refreshed, false)
    }

    /// Apply a changed plan built on prior state; the `id` of the plan is kept
    ///
    /// Name and namespace are immutable: a plan whose `metadata` no longer
    /// matches its `id` fails with [`AdapterError::RequiresReplacement`].
    pub async fn update(&self, plan: &Value) -> Result<Value> {
        self.core.check_plan(validate_plan(&self.core.schema, plan))?;
        if let Some((id, planned)) = identity_change(plan)? {
            return Err(AdapterError::RequiresReplacement {
                type_name: self.type_name().to_string(),
                id,
                planned,
            });
        }
        let state = stamp(&self.core.schema, plan, false)?;
        tracing::info!(type_name = %self.type_name(), id = ?state.get(keys::ID), "updating");
        self.apply(state, "update").await
    }

    /// Delete the object; does not wait for finalizers
    pub async fn delete(&self, state: &Value) -> Result<()> {
        let (namespace, name) = identity(state)?;
        let client = self.core.client("delete")?;
        let api = &self.core.schema.api;

        tracing::info!(type_name = %self.type_name(), namespace = %namespace, name = %name, "deleting");
        client
            .delete(api, &namespace, &name)
            .await
            .map_err(|e| AdapterError::from_api(ApiVerb::Delete, &api.kind, &namespace, &name, e))
    }

    /// Seed state from a `namespace/name` identifier; a read fills the rest
    pub fn import_state(&self, id: &str) -> Result<Value> {
        let id: ImportId = id.parse().map_err(AdapterError::InvalidImportId)?;
        tracing::debug!(type_name = %self.type_name(), import_id = %id, "importing");
        Ok(id.seed_state())
    }

    /// Compare the plan with the live object
    ///
    /// A plan that renames its object is diffed against the object at the
    /// old identity and reported as a replacement.
    pub async fn plan(&self, plan: &Value) -> Result<PlanDiff> {
        self.core.check_plan(validate_plan(&self.core.schema, plan))?;
        let desired = self.core.to_object(plan)?;

        if let Some((id, planned)) = identity_change(plan)? {
            tracing::info!(type_name = %self.type_name(), %id, %planned, "identity changed, replacement required");
            let previous = match id.split_once('/') {
                Some((name, namespace)) => self.live("plan", namespace, name).await?,
                None => None,
            };
            return PlanDiff::replacement(&desired, previous.as_ref());
        }

        let (namespace, name) = identity(plan)?;
        let live = self.live("plan", &namespace, &name).await?;
        PlanDiff::compute(&desired, live.as_ref())
    }

    /// GET that maps 404 to `None`
    async fn live(&self, operation: &'static str, namespace: &str, name: &str) -> Result<Option<Value>> {
        match self.core.get(operation, namespace, name).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn apply(&self, state: Value, operation: &'static str) -> Result<Value> {
        let client = self.core.client(operation)?;
        let schema = &self.core.schema;
        let (namespace, name) = identity(&state)?;

        let object = self.core.to_object(&state)?;
        let params = self.apply_params(&state);
        let conditions = WaitCondition::from_state(&state)?;

        let applied = client
            .apply(&schema.api, &namespace, &name, &object, &params)
            .await
            .map_err(|e| AdapterError::from_api(ApiVerb::Apply, &schema.api.kind, &namespace, &name, e))?;
        let mut state = self.core.to_state(&applied, &state)?;

        if !conditions.is_empty() {
            let target = WaitTarget {
                api: &schema.api,
                namespace: &namespace,
                name: &name,
                default_timeout: self.core.config.wait_timeout,
                interval: self.core.config.poll_interval,
            };
            let waited = wait_for_conditions(client, target, &conditions).await;
            match waited {
                Ok(Some(latest)) => state = self.core.to_state(&latest, &state)?,
                Ok(None) => {}
                Err(source) => {
                    return Err(AdapterError::PartiallyApplied {
                        state: Box::new(state),
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(state)
    }

    fn apply_params(&self, state: &Value) -> ApplyParams {
        let field_manager = state
            .get(keys::FIELD_MANAGER)
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.core.config.field_manager.as_str());
        let force = state
            .get(keys::FORCE_CONFLICTS)
            .and_then(Value::as_bool)
            .unwrap_or(self.core.config.force_conflicts);
        ApplyParams::new(field_manager, force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockResourceClient;
    use crdform_core::{Catalog, Variant, normalize};
    use serde_json::json;
    use std::time::Duration;

    const ELASTICACHE: &str = include_str!("../../../fixtures/crds/elasticache-cacheparametergroups.yaml");
    const LISTENERS: &str = include_str!("../../../fixtures/crds/getambassador-listeners.yaml");

    const PARAMETER_GROUP: &str = "k8s_elasticache_services_k8s_aws_cache_parameter_group_v1alpha1";
    const LISTENER: &str = "k8s_getambassador_io_listener_v3alpha1";

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.add_documents(ELASTICACHE).unwrap();
        catalog.add_documents(LISTENERS).unwrap();
        catalog
    }

    fn adapter(type_name: &str, mock: &MockResourceClient) -> ResourceAdapter {
        let schema = catalog().get(Variant::Resource, type_name).unwrap().clone();
        let mut adapter = ResourceAdapter::new(schema);
        let config = ProviderConfig {
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        };
        let diags = adapter.configure(Some(&ProviderData::new(config, Arc::new(mock.clone()))));
        assert!(diags.is_empty(), "{}", diags);
        adapter
    }

    fn mygroup() -> Value {
        json!({
            "metadata": {"name": "mygroup", "namespace": "default"},
            "spec": {
                "cache_parameter_group_family": "redis6.x",
                "cache_parameter_group_name": "mygroup",
                "description": "test"
            }
        })
    }

    fn https_listener() -> Value {
        json!({
            "metadata": {"name": "https", "namespace": "emissary", "labels": {"app": "emissary"}},
            "spec": {"port": 8443, "protocol_stack": ["TLS", "HTTP"], "security_model": "XFP"}
        })
    }

    #[tokio::test]
    async fn test_create_cache_parameter_group() {
        let mock = MockResourceClient::new();
        let adapter = adapter(PARAMETER_GROUP, &mock);

        let state = adapter.create(&mygroup()).await.unwrap();
        assert_eq!(state["id"], "mygroup/default");
        assert_eq!(state["api_version"], "elasticache.services.k8s.aws/v1alpha1");
        assert_eq!(state["kind"], "CacheParameterGroup");
        assert_eq!(state["spec"]["cache_parameter_group_family"], "redis6.x");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].verb, ApiVerb::Apply);
        assert_eq!(
            calls[0].key.gvr,
            "elasticache.services.k8s.aws/v1alpha1/cacheparametergroups"
        );
        assert_eq!(calls[0].key.namespace, "default");
        assert_eq!(calls[0].key.name, "mygroup");

        let (body, params) = calls[0].apply.clone().unwrap();
        assert_eq!(body["apiVersion"], "elasticache.services.k8s.aws/v1alpha1");
        assert_eq!(body["kind"], "CacheParameterGroup");
        assert_eq!(body["spec"]["cacheParameterGroupFamily"], "redis6.x");
        assert_eq!(params, ApplyParams::new("crdform", false));
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let created = adapter.create(&https_listener()).await.unwrap();
        let read = adapter.read(&created).await.unwrap();
        assert_eq!(normalize(&read), normalize(&created));
        assert_eq!(read["metadata"]["labels"]["app"], "emissary");
        assert!(read["metadata"].get("uid").is_none());
    }

    #[tokio::test]
    async fn test_apply_knobs_override_defaults() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut plan = https_listener();
        plan["field_manager"] = json!("platform");
        plan["force_conflicts"] = json!(true);
        let state = adapter.create(&plan).await.unwrap();
        assert_eq!(state["field_manager"], "platform");

        let (_, params) = mock.calls()[0].apply.clone().unwrap();
        assert_eq!(params, ApplyParams::new("platform", true));
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut state = adapter.create(&https_listener()).await.unwrap();
        state["spec"]["port"] = json!(443);

        let updated = adapter.update(&state).await.unwrap();
        assert_eq!(updated["id"], "https/emissary");
        assert_eq!(updated["spec"]["port"], 443);
        assert_eq!(updated["kind"], "Listener");
        assert_eq!(mock.operation_counts().applies, 2);
    }

    #[tokio::test]
    async fn test_invalid_plan_never_reaches_cluster() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut plan = https_listener();
        plan["spec"]["security_model"] = json!("PLAINTEXT");
        plan["metadata"]["name"] = json!("Not_A_DNS_Name");

        let err = adapter.create(&plan).await.unwrap_err();
        let AdapterError::InvalidPlan { diagnostics, .. } = &err else {
            panic!("expected InvalidPlan, got {err:?}");
        };
        let paths: Vec<String> = diagnostics
            .errors()
            .filter_map(|d| d.path.as_ref().map(ToString::to_string))
            .collect();
        assert!(paths.contains(&"metadata.name".to_string()), "{paths:?}");
        assert!(paths.contains(&"spec.security_model".to_string()), "{paths:?}");
        assert_eq!(mock.operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_marshal_error() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        // Type checks run at validation too; bypass them to exercise conversion.
        let mut plan = stamp(adapter.schema(), &https_listener(), true).unwrap();
        plan["spec"]["port"] = json!("8443");
        let err = adapter.apply(plan, "create").await.unwrap_err();
        assert!(matches!(err, AdapterError::Marshal { .. }));
        assert_eq!(
            err.to_diagnostics().iter().next().unwrap().summary,
            "Error marshalling resource"
        );
    }

    #[tokio::test]
    async fn test_unmarshal_error() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);
        let created = adapter.create(&https_listener()).await.unwrap();

        let api = adapter.schema().api.clone();
        let mut object = mock.object(&api, "emissary", "https").unwrap();
        object["spec"]["port"] = json!("not-a-port");
        mock.insert(&api, "emissary", "https", object);

        let err = adapter.read(&created).await.unwrap_err();
        assert!(matches!(err, AdapterError::Unmarshal { .. }));
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let err = adapter.read(&https_listener()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);
        let state = adapter.create(&https_listener()).await.unwrap();

        adapter.delete(&state).await.unwrap();
        assert_eq!(mock.object_count(), 0);

        let err = adapter.delete(&state).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_api_errors_are_typed() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);
        mock.fail(ApiVerb::Apply, 409, "conflict");

        let err = adapter.create(&https_listener()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Api { verb: ApiVerb::Apply, .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_import_then_read() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);
        adapter.create(&https_listener()).await.unwrap();

        let seeded = adapter.import_state("emissary/https").unwrap();
        assert!(seeded.get("id").is_none());

        let state = adapter.read(&seeded).await.unwrap();
        assert_eq!(state["id"], "https/emissary");
        assert_eq!(state["api_version"], "getambassador.io/v3alpha1");
        assert_eq!(state["spec"]["port"], 8443);
    }

    #[test]
    fn test_import_rejects_malformed_ids() {
        let schema = catalog().get(Variant::Resource, LISTENER).unwrap().clone();
        let adapter = ResourceAdapter::new(schema);

        for bad in ["https", "a/b/c", "/https", "emissary/"] {
            let err = adapter.import_state(bad).unwrap_err();
            assert!(matches!(err, AdapterError::InvalidImportId(_)));
            assert!(err.to_string().contains("namespace/name"));
        }
    }

    #[tokio::test]
    async fn test_offline_short_circuit() {
        let schema = catalog().get(Variant::Resource, LISTENER).unwrap().clone();
        let mut adapter = ResourceAdapter::new(schema);

        assert!(adapter.configure(None).is_empty());

        let diags = adapter.configure(Some(&ProviderData::offline(ProviderConfig::default())));
        assert!(diags.has_error());
        assert_eq!(diags.iter().next().unwrap().summary, "Provider in offline mode");
        assert!(!adapter.is_configured());

        for err in [
            adapter.create(&https_listener()).await.unwrap_err(),
            adapter.read(&https_listener()).await.unwrap_err(),
            adapter.update(&https_listener()).await.unwrap_err(),
            adapter.delete(&https_listener()).await.unwrap_err(),
        ] {
            assert!(matches!(err, AdapterError::Offline { .. }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let schema = catalog().get(Variant::Resource, LISTENER).unwrap().clone();
        let adapter = ResourceAdapter::new(schema);

        let err = adapter.read(&https_listener()).await.unwrap_err();
        assert!(matches!(err, AdapterError::NotConfigured { .. }));
        assert!(err.is_offline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_status() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);
        let api = adapter.schema().api.clone();
        mock.set_status_after(&api, "emissary", "https", 1, json!({"state": "Ready"}));

        let mut plan = https_listener();
        plan["wait_for"] = json!([{"jsonpath": "{.status.state}", "value": "Ready", "timeout": "30s"}]);

        let state = adapter.create(&plan).await.unwrap();
        assert_eq!(state["wait_for"][0]["value"], "Ready");
        assert_eq!(mock.operation_counts().gets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_wait_timeout() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut plan = https_listener();
        plan["wait_for"] = json!([{"jsonpath": ".status.state", "value": "Ready", "timeout": "5s"}]);

        let err = adapter.create(&plan).await.unwrap_err();
        let AdapterError::PartiallyApplied { state, source } = &err else {
            panic!("expected PartiallyApplied, got {err:?}");
        };
        assert!(matches!(**source, AdapterError::WaitTimeout { .. }));
        assert!(err.to_string().starts_with("timed out after 5s"));

        // The object was applied before waiting and the state describes it
        assert_eq!(mock.object_count(), 1);
        assert_eq!(state["id"], "https/emissary");
        assert_eq!(state["spec"]["port"], 8443);
        assert_eq!(state["wait_for"][0]["value"], "Ready");
    }

    #[tokio::test]
    async fn test_plan_diff() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let diff = adapter.plan(&https_listener()).await.unwrap();
        assert_eq!(diff.action, crate::diff::PlanAction::Create);

        let state = adapter.create(&https_listener()).await.unwrap();
        let diff = adapter.plan(&state).await.unwrap();
        assert!(!diff.has_changes(), "{}", diff.to_unified_diff());

        let mut changed = state.clone();
        changed["spec"]["port"] = json!(9443);
        let diff = adapter.plan(&changed).await.unwrap();
        assert_eq!(diff.action, crate::diff::PlanAction::Update);
        assert!(diff.to_unified_diff().contains("+  port: 9443"));
    }

    #[tokio::test]
    async fn test_create_rejects_computed_attributes() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut plan = https_listener();
        plan["kind"] = json!("Mapping");

        let err = adapter.create(&plan).await.unwrap_err();
        let AdapterError::InvalidPlan { diagnostics, .. } = &err else {
            panic!("expected InvalidPlan, got {err:?}");
        };
        let diag = diagnostics.errors().next().unwrap();
        assert_eq!(diag.summary, "Invalid configuration");
        assert_eq!(diag.path.as_ref().unwrap().to_string(), "kind");
        assert_eq!(mock.operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_update_rename_requires_replacement() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut state = adapter.create(&https_listener()).await.unwrap();
        state["metadata"]["name"] = json!("https-v2");

        let err = adapter.update(&state).await.unwrap_err();
        let AdapterError::RequiresReplacement { id, planned, .. } = &err else {
            panic!("expected RequiresReplacement, got {err:?}");
        };
        assert_eq!(id, "https/emissary");
        assert_eq!(planned, "https-v2/emissary");
        assert_eq!(
            err.to_diagnostics().iter().next().unwrap().summary,
            "Resource requires replacement"
        );

        // Nothing was applied under the new name
        assert_eq!(mock.operation_counts().applies, 1);
        assert_eq!(mock.object_count(), 1);
        let api = adapter.schema().api.clone();
        assert!(mock.object(&api, "emissary", "https-v2").is_none());

        state["metadata"]["name"] = json!("https");
        state["metadata"]["namespace"] = json!("ambassador");
        let err = adapter.update(&state).await.unwrap_err();
        assert!(matches!(err, AdapterError::RequiresReplacement { .. }));
    }

    #[tokio::test]
    async fn test_plan_reports_replacement() {
        let mock = MockResourceClient::new();
        let adapter = adapter(LISTENER, &mock);

        let mut state = adapter.create(&https_listener()).await.unwrap();
        state["metadata"]["name"] = json!("https-v2");

        let diff = adapter.plan(&state).await.unwrap();
        assert_eq!(diff.action, crate::diff::PlanAction::Replace);
        assert!(diff.has_changes());
        let unified = diff.to_unified_diff();
        assert!(unified.contains("-  name: https"), "{unified}");
        assert!(unified.contains("+  name: https-v2"), "{unified}");

        // Replacement of an object that is already gone still shows the new one
        adapter.delete(&https_listener()).await.unwrap();
        let diff = adapter.plan(&state).await.unwrap();
        assert_eq!(diff.action, crate::diff::PlanAction::Replace);
        assert!(diff.to_unified_diff().contains("+kind: Listener"));
    }
}

//! Namespaced dynamic client for custom resources
//!
//! [`ResourceClient`] is the only seam between adapters and the cluster:
//! one GET, one server-side-apply PATCH or one DELETE per call, with
//! untyped JSON bodies. [`KubeResourceClient`] implements it with kube-rs.

use async_trait::async_trait;
use crdform_core::{ApiMeta, CrdParser, CrdSchema};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Client, Config,
    api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    discovery::ApiResource,
};
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::{AdapterError, Result};

/// Server-side apply options of one PATCH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyParams {
    pub field_manager: String,
    pub force: bool,
}

impl ApplyParams {
    pub fn new(field_manager: impl Into<String>, force: bool) -> Self {
        Self {
            field_manager: field_manager.into(),
            force,
        }
    }
}

/// REST calls an adapter needs against `{group}/{version}/namespaces/{ns}/{plural}`
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// GET one object
    async fn get(&self, api: &ApiMeta, namespace: &str, name: &str) -> std::result::Result<Value, kube::Error>;

    /// Server-side apply one object and return what the server stored
    async fn apply(
        &self,
        api: &ApiMeta,
        namespace: &str,
        name: &str,
        object: &Value,
        params: &ApplyParams,
    ) -> std::result::Result<Value, kube::Error>;

    /// DELETE one object
    async fn delete(&self, api: &ApiMeta, namespace: &str, name: &str) -> std::result::Result<(), kube::Error>;
}

/// [`ResourceClient`] backed by a kube-rs [`Client`]
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl KubeResourceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the kubeconfig and context of the provider config
    ///
    /// Without an explicit kubeconfig or context the usual inference applies
    /// (`KUBECONFIG`, `~/.kube/config`, then in-cluster).
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..Default::default()
        };

        let kube_config = match (&config.kubeconfig, &config.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(connection)?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(connection)?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options).await.map_err(connection)?,
            (None, None) => Config::infer().await.map_err(connection)?,
        };

        tracing::debug!(cluster = %kube_config.cluster_url, "connecting to cluster");
        let client = Client::try_from(kube_config).map_err(connection)?;
        Ok(Self::new(client))
    }

    /// Access the underlying kube client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Fetch the CRDs installed in the cluster
    pub async fn list_crds(&self) -> Result<Vec<CrdSchema>> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(connection)?;

        let mut crds = Vec::with_capacity(list.items.len());
        for crd in list.items {
            let value = serde_json::to_value(&crd).map_err(crdform_core::CoreError::from)?;
            crds.push(CrdParser::parse_value(&value)?);
        }
        tracing::debug!(count = crds.len(), "fetched CRDs from cluster");
        Ok(crds)
    }

    fn api(&self, meta: &ApiMeta, namespace: &str) -> Api<DynamicObject> {
        let resource = ApiResource {
            group: meta.group.clone(),
            version: meta.version.clone(),
            api_version: meta.api_version(),
            kind: meta.kind.clone(),
            plural: meta.plural.clone(),
        };
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(&self, api: &ApiMeta, namespace: &str, name: &str) -> std::result::Result<Value, kube::Error> {
        tracing::debug!(gvr = %api.gvr(), namespace, name, "GET");
        let object = self.api(api, namespace).get(name).await?;
        serde_json::to_value(object).map_err(kube::Error::SerdeError)
    }

    async fn apply(
        &self,
        api: &ApiMeta,
        namespace: &str,
        name: &str,
        object: &Value,
        params: &ApplyParams,
    ) -> std::result::Result<Value, kube::Error> {
        tracing::debug!(
            gvr = %api.gvr(),
            namespace,
            name,
            field_manager = %params.field_manager,
            force = params.force,
            "PATCH (server-side apply)"
        );

        let mut patch_params = PatchParams::apply(&params.field_manager);
        if params.force {
            patch_params = patch_params.force();
        }

        let applied = self
            .api(api, namespace)
            .patch(name, &patch_params, &Patch::Apply(object))
            .await?;
        serde_json::to_value(applied).map_err(kube::Error::SerdeError)
    }

    async fn delete(&self, api: &ApiMeta, namespace: &str, name: &str) -> std::result::Result<(), kube::Error> {
        tracing::debug!(gvr = %api.gvr(), namespace, name, "DELETE");
        self.api(api, namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

fn connection(err: impl std::fmt::Display) -> AdapterError {
    AdapterError::Connection {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_params() {
        let params = ApplyParams::new("crdform", true);
        assert_eq!(params.field_manager, "crdform");
        assert!(params.force);
    }

    #[test]
    fn test_crd_roundtrip_through_k8s_openapi() {
        let yaml = include_str!("../../../fixtures/crds/getambassador-listeners.yaml");
        let crd: CustomResourceDefinition = serde_yaml::from_str(yaml).unwrap();
        let value = serde_json::to_value(&crd).unwrap();

        let schema = CrdParser::parse_value(&value).unwrap();
        assert_eq!(schema.names.kind, "Listener");
        assert_eq!(schema.group, "getambassador.io");
    }
}

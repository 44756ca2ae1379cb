//! Provider: the catalog of resource types plus the shared client handle

use crdform_core::{Catalog, Diagnostics, ResourceSchema, Variant};
use std::sync::Arc;

use crate::adapter::ResourceAdapter;
use crate::client::{KubeResourceClient, ResourceClient};
use crate::config::{ProviderConfig, ProviderData};
use crate::data_source::DataSourceAdapter;
use crate::error::{AdapterError, Result};
use crate::manifest::ManifestAdapter;

pub struct Provider {
    catalog: Catalog,
    config: ProviderConfig,
    client: Option<Arc<dyn ResourceClient>>,
}

impl Provider {
    pub fn new(catalog: Catalog, config: ProviderConfig) -> Self {
        Self {
            catalog,
            config,
            client: None,
        }
    }

    /// Use an existing client instead of connecting
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn ResourceClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Connect to the cluster unless offline or already connected
    pub async fn connect(&mut self) -> Result<()> {
        if self.config.offline || self.client.is_some() {
            return Ok(());
        }
        let client = KubeResourceClient::connect(&self.config).await?;
        self.client = Some(Arc::new(client));
        Ok(())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// What every adapter receives through `configure`
    pub fn data(&self) -> ProviderData {
        match &self.client {
            Some(client) if !self.config.offline => ProviderData::new(self.config.clone(), Arc::clone(client)),
            _ => ProviderData::offline(self.config.clone()),
        }
    }

    /// Managed resource adapter, configured with the provider data
    pub fn resource(&self, type_name: &str) -> Result<(ResourceAdapter, Diagnostics)> {
        let mut adapter = ResourceAdapter::new(self.schema(Variant::Resource, type_name)?.clone());
        let diags = adapter.configure(Some(&self.data()));
        Ok((adapter, diags))
    }

    /// Data source adapter, configured with the provider data
    pub fn data_source(&self, type_name: &str) -> Result<(DataSourceAdapter, Diagnostics)> {
        let mut adapter = DataSourceAdapter::new(self.schema(Variant::DataSource, type_name)?.clone());
        let diags = adapter.configure(Some(&self.data()));
        Ok((adapter, diags))
    }

    /// Manifest adapter; needs no client
    pub fn manifest(&self, type_name: &str) -> Result<ManifestAdapter> {
        Ok(ManifestAdapter::new(self.schema(Variant::Manifest, type_name)?.clone()))
    }

    /// Schema lookup with a "did you mean" hint on failure
    pub fn schema(&self, variant: Variant, type_name: &str) -> Result<&ResourceSchema> {
        self.catalog
            .get(variant, type_name)
            .ok_or_else(|| AdapterError::UnknownType {
                name: type_name.to_string(),
                suggestion: self.catalog.suggest(type_name),
            })
    }
}

//! Read-only adapter exposing a live object, including its status

use crdform_core::{Diagnostics, ResourceSchema, validate_config};
use serde_json::Value;

use crate::adapter::{AdapterCore, identity, stamp};
use crate::config::ProviderData;
use crate::error::Result;

#[derive(Clone)]
pub struct DataSourceAdapter {
    core: AdapterCore,
}

impl DataSourceAdapter {
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

    pub fn configure(&mut self, data: Option<&ProviderData>) -> Diagnostics {
        self.core.configure(data)
    }

    pub fn validate(&self, config: &Value) -> Diagnostics {
        validate_config(&self.core.schema, config)
    }

    /// GET the object named by `metadata` and return it as state
    pub async fn read(&self, config: &Value) -> Result<Value> {
        self.core.check_plan(self.validate(config))?;
        let (namespace, name) = identity(config)?;

        tracing::debug!(type_name = %self.type_name(), namespace = %namespace, name = %name, "reading data source");
        let object = self.core.get("read", &namespace, &name).await?;
        let state = self.core.to_state(&object, config)?;
        stamp(&self.core.schema, &state, true)
    }
}

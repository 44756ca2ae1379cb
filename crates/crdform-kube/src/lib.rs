//! crdform kube - Kubernetes adapters for custom resources
//!
//! This crate provides:
//! - **Resource adapter**: create, read, update, delete and import through server-side apply
//! - **Data sources**: read a live object including its status
//! - **Manifests**: render the object to YAML without a cluster
//! - **Client seam**: [`ResourceClient`] with a kube-rs implementation and an in-memory mock
//! - **Wait conditions**: JSONPath polling after apply
//! - **Plan diff**: compare a plan with the live object

pub mod adapter;
pub mod client;
pub mod config;
pub mod data_source;
pub mod diff;
pub mod error;
pub mod manifest;
pub mod mock;
pub mod provider;
pub mod wait;

pub use adapter::ResourceAdapter;
pub use client::{ApplyParams, KubeResourceClient, ResourceClient};
pub use config::{DEFAULT_FIELD_MANAGER, ProviderConfig, ProviderData};
pub use data_source::DataSourceAdapter;
pub use diff::{DiffContent, DiffLine, LineType, PlanAction, PlanDiff};
pub use error::{AdapterError, ApiVerb, Result};
pub use manifest::ManifestAdapter;
pub use mock::{MockResourceClient, OperationCounts};
pub use provider::Provider;
pub use wait::WaitCondition;

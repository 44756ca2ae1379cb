//! Global options shared by every command, and the provider they build

use clap::Args;
use console::style;
use crdform_core::{Catalog, DEFAULT_PROVIDER_NAME};
use crdform_kube::{KubeResourceClient, Provider, ProviderConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CliError, Result};
use crate::state::{DEFAULT_STATE_DIR, StateStore};

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// CRD file or directory to load (repeatable)
    #[arg(long = "crds", global = true, env = "CRDFORM_CRDS", value_delimiter = ',')]
    pub crds: Vec<PathBuf>,

    /// Also load every CRD installed in the cluster
    #[arg(long, global = true)]
    pub crds_from_cluster: bool,

    /// Provider configuration file (default: ~/.config/crdform/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Never contact the cluster
    #[arg(long, global = true)]
    pub offline: bool,

    /// Field manager for server-side apply
    #[arg(long, global = true)]
    pub field_manager: Option<String>,

    /// Take ownership of fields managed by others
    #[arg(long, global = true)]
    pub force_conflicts: bool,

    /// Path to a kubeconfig file
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Prefix of every resource type name
    #[arg(long, global = true, default_value = DEFAULT_PROVIDER_NAME)]
    pub provider_name: String,

    /// Directory of the local state files
    #[arg(long, global = true, default_value = DEFAULT_STATE_DIR)]
    pub state_dir: PathBuf,
}

impl GlobalArgs {
    /// Provider configuration: file, then environment, then flags
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let config = match &self.config {
            Some(path) => ProviderConfig::load_from(path)?,
            None => ProviderConfig::load()?,
        };
        let mut config = config.with_env();

        if self.offline {
            config.offline = true;
        }
        if self.force_conflicts {
            config.force_conflicts = true;
        }
        if let Some(field_manager) = &self.field_manager {
            config.field_manager = field_manager.clone();
        }
        if self.kubeconfig.is_some() {
            config.kubeconfig = self.kubeconfig.clone();
        }
        if self.context.is_some() {
            config.context = self.context.clone();
        }
        Ok(config)
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state_dir)
    }

    /// Catalog from the local CRD files only
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new(&self.provider_name);
        for path in &self.crds {
            if !path.exists() {
                return Err(CliError::usage(format!("CRD path not found: {}", path.display())));
            }
            let added = catalog.load_path(path)?;
            tracing::debug!(path = %path.display(), added, "loaded CRDs");
        }
        Ok(catalog)
    }

    /// Build the provider; `online` commands connect to the cluster
    pub async fn provider(&self, online: bool) -> Result<Provider> {
        let config = self.provider_config()?;
        let mut catalog = self.catalog()?;
        let mut client = None;

        if self.crds_from_cluster {
            if config.offline {
                return Err(CliError::usage_with_help(
                    "--crds-from-cluster needs a cluster",
                    "drop --offline, or pass CRD files with --crds",
                ));
            }
            let kube = KubeResourceClient::connect(&config).await?;
            let mut added = 0;
            for crd in kube.list_crds().await? {
                added += catalog.add_crd(&crd)?;
            }
            tracing::info!(added, "loaded CRDs from the cluster");
            client = Some(kube);
        }

        if catalog.is_empty() {
            return Err(CliError::usage_with_help(
                "no resource types loaded",
                "pass CRD files with --crds <path> (or CRDFORM_CRDS), or use --crds-from-cluster",
            ));
        }

        for warning in catalog.warnings().iter() {
            tracing::warn!("{}", warning);
        }

        let mut provider = Provider::new(catalog, config);
        if let Some(kube) = client {
            provider = provider.with_client(Arc::new(kube));
        }
        if online {
            provider.connect().await?;
            if provider.config().offline {
                eprintln!("{} Offline mode: the cluster will not be contacted", style("⚠").yellow());
            }
        }
        Ok(provider)
    }
}

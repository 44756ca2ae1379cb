//! Catalog of resource types built from CRD documents

use indexmap::IndexMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::crd::{CrdParser, CrdSchema, CrdScope};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::naming::MANIFEST_SUFFIX;
use crate::resource::{ResourceSchema, Variant};
use crate::suggestions::closest_match;

/// Default provider name used as the type name prefix
pub const DEFAULT_PROVIDER_NAME: &str = "k8s";

/// The three schemas generated for one served CRD version
#[derive(Debug, Clone)]
pub struct KindEntry {
    pub resource: ResourceSchema,
    pub data_source: ResourceSchema,
    pub manifest: ResourceSchema,
}

impl KindEntry {
    pub fn get(&self, variant: Variant) -> &ResourceSchema {
        match variant {
            Variant::Resource => &self.resource,
            Variant::DataSource => &self.data_source,
            Variant::Manifest => &self.manifest,
        }
    }
}

/// Every resource type known to the provider, keyed by resource type name
#[derive(Debug, Clone)]
pub struct Catalog {
    provider_name: String,
    kinds: IndexMap<String, KindEntry>,
    warnings: Diagnostics,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_NAME)
    }
}

impl Catalog {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            kinds: IndexMap::new(),
            warnings: Diagnostics::new(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Add every served version of a CRD; returns the number of kinds added
    pub fn add_crd(&mut self, crd: &CrdSchema) -> Result<usize> {
        if crd.scope == CrdScope::Cluster {
            tracing::warn!(crd = %crd.name, "skipping cluster-scoped CRD");
            self.warnings.push(Diagnostic::warning(
                "Skipped cluster-scoped CRD",
                format!("{} is cluster-scoped; only namespaced resources are supported", crd.name),
            ));
            return Ok(0);
        }

        let mut added = 0;
        for version in crd.served_versions() {
            let resource =
                ResourceSchema::from_crd(&self.provider_name, crd, version, Variant::Resource, &mut self.warnings)?;

            if self.kinds.contains_key(&resource.type_name) {
                tracing::warn!(type_name = %resource.type_name, "duplicate resource type, keeping the first definition");
                self.warnings.push(Diagnostic::warning(
                    "Duplicate resource type",
                    format!("{} is defined more than once; keeping the first definition", resource.type_name),
                ));
                continue;
            }

            // The other variants reuse the same field tree; only record warnings once.
            let mut ignored = Diagnostics::new();
            let data_source =
                ResourceSchema::from_crd(&self.provider_name, crd, version, Variant::DataSource, &mut ignored)?;
            let manifest =
                ResourceSchema::from_crd(&self.provider_name, crd, version, Variant::Manifest, &mut ignored)?;

            tracing::debug!(type_name = %resource.type_name, "registered resource type");
            self.kinds.insert(
                resource.type_name.clone(),
                KindEntry {
                    resource,
                    data_source,
                    manifest,
                },
            );
            added += 1;
        }
        Ok(added)
    }

    /// Add all CRDs of a (multi-document) YAML or JSON string
    pub fn add_documents(&mut self, content: &str) -> Result<usize> {
        let mut added = 0;
        for crd in CrdParser::parse_documents(content)? {
            added += self.add_crd(&crd)?;
        }
        Ok(added)
    }

    /// Load a single file of CRD documents
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let added = self.add_documents(&content)?;
        tracing::debug!(path = %path.display(), added, "loaded CRD file");
        Ok(added)
    }

    /// Recursively load `.yaml`, `.yml` and `.json` files of a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut added = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if entry.file_type().is_file() && is_crd_file(entry.path()) {
                added += self.load_file(entry.path())?;
            }
        }
        Ok(added)
    }

    /// Load a file or a directory
    pub fn load_path(&mut self, path: &Path) -> Result<usize> {
        if path.is_dir() {
            self.load_dir(path)
        } else {
            self.load_file(path)
        }
    }

    pub fn get(&self, variant: Variant, type_name: &str) -> Option<&ResourceSchema> {
        match variant {
            Variant::Manifest => {
                let base = type_name.strip_suffix(MANIFEST_SUFFIX)?;
                self.kinds.get(base).map(|k| &k.manifest)
            }
            other => self.kinds.get(type_name).map(|k| k.get(other)),
        }
    }

    /// Resolve a type name as written in a plan: manifest names by suffix,
    /// everything else as a managed resource
    pub fn resolve(&self, type_name: &str) -> Option<&ResourceSchema> {
        if type_name.ends_with(MANIFEST_SUFFIX) {
            self.get(Variant::Manifest, type_name)
        } else {
            self.get(Variant::Resource, type_name)
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = &KindEntry> {
        self.kinds.values()
    }

    /// Resource type names followed by their manifest names
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.kinds.keys().cloned().collect();
        names.extend(self.kinds.values().map(|k| k.manifest.type_name.clone()));
        names
    }

    /// Closest known type name, for "did you mean" hints
    pub fn suggest(&self, type_name: &str) -> Option<String> {
        let names = self.type_names();
        closest_match(type_name, names.iter().map(String::as_str))
    }

    /// Run the schema self-check on every schema of the catalog
    pub fn validate_implementation(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for kind in self.kinds.values() {
            for schema in [&kind.resource, &kind.data_source, &kind.manifest] {
                for diag in schema.validate_implementation() {
                    diags.push(Diagnostic {
                        summary: format!("{} ({}): {}", schema.type_name, schema.variant, diag.summary),
                        ..diag
                    });
                }
            }
        }
        diags
    }

    /// Warnings collected while loading CRDs
    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn is_crd_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixtures() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/crds"))
    }

    #[test]
    fn test_load_dir() {
        let mut catalog = Catalog::default();
        let added = catalog.load_dir(&fixtures()).unwrap();

        assert_eq!(added, 3);
        assert_eq!(catalog.len(), 3);
        assert!(catalog
            .warnings()
            .iter()
            .any(|w| w.summary == "Skipped cluster-scoped CRD"));

        let schema = catalog
            .get(Variant::Resource, "k8s_getambassador_io_listener_v3alpha1")
            .unwrap();
        assert_eq!(schema.api.plural, "listeners");
    }

    #[test]
    fn test_schemas_are_valid() {
        let mut catalog = Catalog::default();
        catalog.load_dir(&fixtures()).unwrap();

        let diags = catalog.validate_implementation();
        assert!(diags.is_empty(), "{}", diags);
    }

    #[test]
    fn test_variant_lookup() {
        let mut catalog = Catalog::default();
        catalog.load_dir(&fixtures()).unwrap();

        let name = "k8s_operator_cluster_x_k8s_io_core_provider_v1alpha2";
        let manifest_name = format!("{}_manifest", name);

        assert_eq!(catalog.resolve(name).unwrap().variant, Variant::Resource);
        assert_eq!(catalog.resolve(&manifest_name).unwrap().variant, Variant::Manifest);
        assert_eq!(
            catalog.get(Variant::DataSource, name).unwrap().variant,
            Variant::DataSource
        );
        assert!(catalog.get(Variant::Manifest, name).is_none());
        assert!(catalog.type_names().contains(&manifest_name));
    }

    #[test]
    fn test_suggest() {
        let mut catalog = Catalog::default();
        catalog.load_dir(&fixtures()).unwrap();

        assert_eq!(
            catalog.suggest("k8s_getambassador_io_listener_v3alpha2").as_deref(),
            Some("k8s_getambassador_io_listener_v3alpha1")
        );
        assert_eq!(catalog.suggest("aws_s3_bucket"), None);
    }

    #[test]
    fn test_provider_name_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let crd = std::fs::read_to_string(fixtures().join("getambassador-listeners.yaml")).unwrap();
        std::fs::write(dir.path().join("a.yaml"), &crd).unwrap();
        std::fs::write(dir.path().join("b.yml"), &crd).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a CRD").unwrap();

        let mut catalog = Catalog::new("emissary");
        let added = catalog.load_dir(dir.path()).unwrap();
        assert_eq!(added, 1);
        assert!(catalog.resolve("emissary_getambassador_io_listener_v3alpha1").is_some());
        assert!(catalog
            .warnings()
            .iter()
            .any(|w| w.summary == "Duplicate resource type"));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "kind: CustomResourceDefinition\nspec: [").unwrap();

        let mut catalog = Catalog::default();
        assert!(catalog.load_file(&path).is_err());
    }
}

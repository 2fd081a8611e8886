//! YAML bundle manifests.
//!
//! A manifest declares one bundle and the descriptors of the capabilities it
//! owns. Handlers cannot be expressed in YAML, so manifest capabilities are
//! stored without one; a dispatch layer attaches behaviour by name.
//!
//! ```yaml
//! bundle:
//!   name: "math"
//!   description: "Perform mathematical calculations and evaluations"
//!   tags: ["math", "calculation"]
//!   category: "computation"
//! capabilities:
//!   - name: "calculate"
//!     description: "Evaluate a mathematical expression"
//!     input_schema:
//!       type: object
//!       properties:
//!         expression: { type: string }
//!       required: [expression]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::bundle::Bundle;
use super::capability::CapabilityDef;
use super::error::RegistryError;

/// One bundle plus the descriptors of its capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub bundle: Bundle,

    #[serde(default)]
    pub capabilities: Vec<CapabilityDef>,
}

impl BundleManifest {
    /// Parse a manifest from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse a manifest from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }
}

/// Whether `path` looks like a manifest file (`.yaml` / `.yml`).
pub(crate) fn is_manifest_path(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == "yaml" || ext == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let yaml = r#"
bundle:
  name: "web-research"
  description: "Search the web and fetch page content"
  tags: ["web", "search"]
  dependencies: ["text-processing"]
capabilities:
  - name: "web_search"
    description: "Search the web"
  - name: "fetch_page"
    description: "Fetch a page"
"#;
        let manifest = BundleManifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.bundle.name, "web-research");
        assert_eq!(manifest.bundle.dependencies, vec!["text-processing"]);
        assert_eq!(manifest.capabilities.len(), 2);
        assert_eq!(manifest.capabilities[1].name, "fetch_page");
    }

    #[test]
    fn test_manifest_without_capabilities() {
        let manifest = BundleManifest::from_yaml("bundle:\n  name: empty\n").unwrap();
        assert!(manifest.capabilities.is_empty());
    }

    #[test]
    fn test_manifest_requires_bundle_block() {
        assert!(BundleManifest::from_yaml("capabilities: []").is_err());
    }

    #[test]
    fn test_manifest_path_detection() {
        assert!(is_manifest_path(Path::new("skills/web.yaml")));
        assert!(is_manifest_path(Path::new("skills/web.yml")));
        assert!(!is_manifest_path(Path::new("skills/README.md")));
        assert!(!is_manifest_path(Path::new("skills/noext")));
    }
}

use crate::error::{ManifestError, Result};
use crate::model::Manifest;
use crate::validation::ManifestValidator;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::{debug, info};

/// Serialization formats a manifest file may be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "json" => Ok(ManifestFormat::Json),
            _ => Err(ManifestError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Load access manifests from disk or strings
pub struct ManifestLoader;

impl ManifestLoader {
    /// Read, parse and structurally validate a manifest file
    pub fn load_from_file(path: &Path) -> Result<Manifest> {
        debug!("Loading manifest from: {:?}", path);

        let format = ManifestFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let manifest = Self::from_str(&content, format)?;

        info!(
            "Loaded manifest from {:?} with {} rule(s) and {} ignore entr(ies)",
            path,
            manifest.rbac_rules.len(),
            manifest.ignore.len()
        );

        Ok(manifest)
    }

    /// Parse and validate manifest text
    pub fn from_str(content: &str, format: ManifestFormat) -> Result<Manifest> {
        let raw = Self::parse_raw(content, format)?;
        ManifestValidator::validate(&raw)
    }

    /// Parse manifest text into an untyped document without validating it
    pub fn parse_raw(content: &str, format: ManifestFormat) -> Result<JsonValue> {
        let raw = match format {
            ManifestFormat::Yaml => serde_yaml::from_str::<JsonValue>(content)?,
            ManifestFormat::Json => serde_json::from_str::<JsonValue>(content)?,
        };
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Inherit, TargetKind};
    use std::fs;
    use tempfile::TempDir;

    const YAML_MANIFEST: &str = r#"
ignore:
  - target_type: GROUP
    target_names: [contractors]
rbac_rules:
  - target_type: ou
    target_names: [workloads]
    permission_set_name: ReadOnly
    principal_name: devs
    principal_type: group
    nested: true
"#;

    #[test]
    fn test_load_yaml_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.yml");
        fs::write(&path, YAML_MANIFEST).unwrap();

        let manifest = ManifestLoader::load_from_file(&path).unwrap();
        assert_eq!(manifest.rbac_rules.len(), 1);
        assert_eq!(manifest.rbac_rules[0].target_kind, TargetKind::Ou);
        assert_eq!(manifest.rbac_rules[0].inherit, Inherit::Full);
        assert_eq!(manifest.ignore.len(), 1);
    }

    #[test]
    fn test_load_json_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"rbac_rules": [{"target_type": "ACCOUNT", "target_names": ["acct-1"],
                "permission_set_name": "Admin", "principal_name": "alice", "principal_type": "USER"}]}"#,
        )
        .unwrap();

        let manifest = ManifestLoader::load_from_file(&path).unwrap();
        assert_eq!(manifest.rbac_rules[0].principal_name, "alice");
        assert!(manifest.ignore.is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.toml");
        fs::write(&path, "rbac_rules = []").unwrap();

        let result = ManifestLoader::load_from_file(&path);
        assert!(matches!(result, Err(ManifestError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = ManifestLoader::from_str("rbac_rules: [unterminated", ManifestFormat::Yaml);
        assert!(matches!(result, Err(ManifestError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ManifestLoader::load_from_file(Path::new("/nonexistent/manifest.yaml"));
        assert!(matches!(result, Err(ManifestError::Io(_))));
    }
}

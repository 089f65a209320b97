use crate::error::{ReconcileError, Result};
use crate::policy::ReconcilePolicy;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File stem the reconciler configuration is loaded from
pub const CONFIG_FILE_STEM: &str = "config.reconciler";

pub const ENV_DRY_RUN: &str = "GRANTSYNC_DRY_RUN";
pub const ENV_GUARDRAIL: &str = "GRANTSYNC_GUARDRAIL";
pub const ENV_MAX_CONCURRENCY: &str = "GRANTSYNC_MAX_CONCURRENCY";

/// Configuration module document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationDefinition {
    /// Unique identifier, `reconciler` for this module
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The crate that consumes these values
    pub provider: String,
    pub version: String,
    #[serde(default)]
    pub values: HashMap<String, Value>,
}

/// Reconciler settings loaded from a `config.reconciler.yaml` document
#[derive(Debug, Clone)]
pub struct ReconcilerConfiguration {
    definition: ConfigurationDefinition,
    source: Option<PathBuf>,
}

impl ReconcilerConfiguration {
    pub fn new(definition: ConfigurationDefinition) -> Self {
        Self {
            definition,
            source: None,
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let definition: ConfigurationDefinition = serde_yaml::from_str(content)
            .map_err(|e| ReconcileError::Configuration(e.to_string()))?;
        let config = Self::new(definition);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReconcileError::Configuration(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_yaml(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Find `config.reconciler.yaml` (or `.yml`) in a directory.
    ///
    /// A missing directory or file is not an error; defaults apply.
    pub fn load_from_directory(dir: &Path) -> Result<Option<Self>> {
        if !dir.exists() {
            debug!("Configuration directory {:?} does not exist", dir);
            return Ok(None);
        }

        for extension in ["yaml", "yml"] {
            let path = dir.join(format!("{}.{}", CONFIG_FILE_STEM, extension));
            if path.is_file() {
                let config = Self::from_file(&path)?;
                info!("Loaded configuration from {:?}", path);
                return Ok(Some(config));
            }
        }

        debug!("No reconciler configuration found in {:?}", dir);
        Ok(None)
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.definition.values.get(key)
    }

    /// Look up a value with dot notation, e.g. `retry.max_retries`
    pub fn get_nested(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get_value(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn validate(&self) -> Result<()> {
        if self.definition.id.is_empty() {
            return Err(ReconcileError::Configuration(
                "Configuration ID cannot be empty".to_string(),
            ));
        }
        if self.definition.provider.is_empty() {
            return Err(ReconcileError::Configuration(
                "Configuration provider cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Policy described by the configured values, defaults filling the gaps
    pub fn policy(&self) -> Result<ReconcilePolicy> {
        let mapping: serde_yaml::Mapping = self
            .definition
            .values
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect();
        serde_yaml::from_value(Value::Mapping(mapping)).map_err(|e| {
            ReconcileError::Configuration(format!("invalid reconciler values: {}", e))
        })
    }

    /// Directory for rolling log files, if configured
    pub fn log_directory(&self) -> Option<PathBuf> {
        self.get_nested("logging.directory")
            .and_then(Value::as_str)
            .map(PathBuf::from)
    }
}

/// Apply environment overrides on top of a policy.
///
/// `lookup` is usually `|key| std::env::var(key).ok()`; unparseable values are
/// logged and ignored.
pub fn apply_env_overrides<F>(policy: &mut ReconcilePolicy, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_DRY_RUN) {
        match parse_bool(&raw) {
            Some(value) => policy.dry_run = value,
            None => warn!("Ignoring {}={}: expected a boolean", ENV_DRY_RUN, raw),
        }
    }
    if let Some(raw) = lookup(ENV_GUARDRAIL) {
        match parse_bool(&raw) {
            Some(value) => policy.guardrail = value,
            None => warn!("Ignoring {}={}: expected a boolean", ENV_GUARDRAIL, raw),
        }
    }
    if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
        match raw.trim().parse::<usize>() {
            Ok(value) => policy.max_concurrency = value,
            Err(_) => warn!("Ignoring {}={}: expected a number", ENV_MAX_CONCURRENCY, raw),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PhaseOrder;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
id: reconciler
name: Reconciler
provider: reconciler
version: "1.0.0"
values:
  dry_run: false
  guardrail: true
  ordering: deletes_first
  max_concurrency: 8
  retry:
    max_retries: 5
  logging:
    directory: /var/log/grantsync
"#;

    #[test]
    fn test_policy_from_values() {
        let config = ReconcilerConfiguration::from_yaml(SAMPLE).unwrap();
        let policy = config.policy().unwrap();

        assert_eq!(config.id(), "reconciler");
        assert!(!policy.dry_run);
        assert!(policy.guardrail);
        assert_eq!(policy.ordering, PhaseOrder::DeletesFirst);
        assert_eq!(policy.max_concurrency, 8);
        assert_eq!(policy.retry.max_retries, 5);
        assert_eq!(policy.retry.base_delay_ms, 500);
        assert_eq!(
            config.log_directory(),
            Some(PathBuf::from("/var/log/grantsync"))
        );
    }

    #[test]
    fn test_empty_values_give_defaults() {
        let config = ReconcilerConfiguration::from_yaml(
            "id: reconciler\nname: R\nprovider: reconciler\nversion: '1'\n",
        )
        .unwrap();
        assert_eq!(config.policy().unwrap(), ReconcilePolicy::default());
        assert!(config.log_directory().is_none());
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let config = ReconcilerConfiguration::from_yaml(
            "id: reconciler\nname: R\nprovider: reconciler\nversion: '1'\nvalues:\n  ordering: sideways\n",
        )
        .unwrap();
        assert!(matches!(
            config.policy(),
            Err(ReconcileError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_provider_is_rejected() {
        let result = ReconcilerConfiguration::from_yaml(
            "id: reconciler\nname: R\nprovider: ''\nversion: '1'\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        assert!(ReconcilerConfiguration::load_from_directory(dir.path())
            .unwrap()
            .is_none());

        let path = dir.path().join("config.reconciler.yml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = ReconcilerConfiguration::load_from_directory(dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(config.source(), Some(path.as_path()));
        assert_eq!(
            config.get_nested("retry.max_retries").and_then(Value::as_u64),
            Some(5)
        );
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let result =
            ReconcilerConfiguration::load_from_directory(Path::new("/nonexistent/grantsync"));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut policy = ReconcilePolicy::default();
        let env: HashMap<&str, &str> = [
            (ENV_DRY_RUN, "false"),
            (ENV_GUARDRAIL, "yes"),
            (ENV_MAX_CONCURRENCY, "not-a-number"),
        ]
        .into_iter()
        .collect();

        apply_env_overrides(&mut policy, |key| env.get(key).map(|v| v.to_string()));

        assert!(!policy.dry_run);
        assert!(policy.guardrail);
        assert_eq!(policy.max_concurrency, 4);
    }
}

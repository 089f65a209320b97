use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment-based path configuration
#[derive(Debug, Clone)]
pub struct EnvPaths {
    pub configuration_path: PathBuf,
    /// Rolling log directory, only set when `GRANTSYNC_LOG_DIR` is
    pub log_path: Option<PathBuf>,
}

impl EnvPaths {
    /// Load paths from environment variables with defaults
    pub fn load() -> Result<Self> {
        Self::load_with_base(None)
    }

    /// Load paths from environment variables with an optional base directory.
    /// A `.env` file in the current directory is read first when no base is given.
    pub fn load_with_base(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = if let Some(base) = base_dir {
            base
        } else {
            if let Ok(env_path) = env::current_dir() {
                let env_file = env_path.join(".env");
                if env_file.exists() {
                    dotenv::from_path(&env_file).ok();
                }
            }
            env::current_dir().context("Failed to get current directory")?
        };

        Ok(Self {
            configuration_path: Self::get_path_from_env("CONFIGURATION_PATH", "./config", &base),
            log_path: env::var("GRANTSYNC_LOG_DIR")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(|value| Self::absolutize(PathBuf::from(value), &base)),
        })
    }

    /// Get a path from environment variable or use default
    fn get_path_from_env(var_name: &str, default: &str, base_dir: &Path) -> PathBuf {
        let path_str = env::var(var_name).unwrap_or_else(|_| default.to_string());
        Self::absolutize(PathBuf::from(path_str), base_dir)
    }

    fn absolutize(path: PathBuf, base_dir: &Path) -> PathBuf {
        if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests share process environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_env_paths_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::remove_var("CONFIGURATION_PATH");
        env::remove_var("GRANTSYNC_LOG_DIR");

        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_path_buf();
        let paths = EnvPaths::load_with_base(Some(base.clone())).unwrap();

        assert_eq!(paths.configuration_path, base.join("config"));
        assert!(paths.log_path.is_none());
    }

    #[test]
    fn test_env_paths_with_relative_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CONFIGURATION_PATH", "./custom_config");
        env::set_var("GRANTSYNC_LOG_DIR", "logs");

        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_path_buf();
        let paths = EnvPaths::load_with_base(Some(base.clone())).unwrap();

        assert!(paths.configuration_path.ends_with("custom_config"));
        assert!(paths.configuration_path.starts_with(&base));
        assert_eq!(paths.log_path, Some(base.join("logs")));

        env::remove_var("CONFIGURATION_PATH");
        env::remove_var("GRANTSYNC_LOG_DIR");
    }

    #[test]
    fn test_env_paths_with_absolute_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let absolute = temp_dir.path().join("elsewhere");
        env::set_var("CONFIGURATION_PATH", absolute.to_str().unwrap());
        env::set_var("GRANTSYNC_LOG_DIR", "   ");

        let paths = EnvPaths::load_with_base(Some(PathBuf::from("/unused"))).unwrap();

        assert_eq!(paths.configuration_path, absolute);
        assert!(paths.log_path.is_none());

        env::remove_var("CONFIGURATION_PATH");
        env::remove_var("GRANTSYNC_LOG_DIR");
    }
}

//! Infrastructure implementation of the `ConfigStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{TestnodeConfig, validate_config};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "TESTNODE_CONFIG";

/// Production implementation of `ConfigStore` that reads a YAML file.
#[derive(Debug, Default, Clone)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    /// A store reading `path` instead of the environment/home default.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            explicit: Some(path),
        }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<TestnodeConfig> {
        let path = self.path()?;
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        } else {
            // An explicitly requested file must exist.
            anyhow::ensure!(
                self.explicit.is_none(),
                "config file {} not found",
                path.display()
            );
            TestnodeConfig::default()
        };

        config.ssh.identity_file = config.ssh.identity_file.as_deref().map(expand_home);
        config.ssh.known_hosts_file = config.ssh.known_hosts_file.as_deref().map(expand_home);
        config.node.cloud_init = config.node.cloud_init.as_deref().map(expand_home);

        validate_config(&config).with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".testnode").join("config.yaml"))
    }
}

/// Replace a leading `~/` with the user's home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

//! Domain types and validators for testnode configuration.
//!
//! Pure functions only. No I/O and no async.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use testnode_common::NodeSpec;

use crate::domain::error::ConfigError;
use crate::domain::machine::DEFAULT_RUNTIME_PROCESS;
use crate::domain::port_pool::BEGINNING_PORT;

/// `killall` target names: a single token, no shell metacharacters.
pub static RUNTIME_PROCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Which backend creates and destroys nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Multipass,
    Static,
}

/// Top-level configuration stored in `~/.testnode/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestnodeConfig {
    pub provider: ProviderKind,
    pub ports: PortRangeConfig,
    pub ssh: SshConfig,
    /// Process name terminated by `reset`.
    pub runtime_process: String,
    /// Launch parameters for new nodes.
    pub node: NodeSpec,
    pub launch_timeout_secs: u64,
    /// Hosts used by the `static` provider.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub static_hosts: Vec<StaticHost>,
}

impl Default for TestnodeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            ports: PortRangeConfig::default(),
            ssh: SshConfig::default(),
            runtime_process: DEFAULT_RUNTIME_PROCESS.to_string(),
            node: NodeSpec::default(),
            launch_timeout_secs: 600,
            static_hosts: Vec::new(),
        }
    }
}

/// Inbound ports the provider grants every node: `[base, base + count)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PortRangeConfig {
    pub base: u16,
    pub count: u16,
}

impl Default for PortRangeConfig {
    fn default() -> Self {
        Self {
            base: BEGINNING_PORT,
            count: 100,
        }
    }
}

impl PortRangeConfig {
    /// Ports of the range in ascending order.
    #[must_use]
    pub fn ports(&self) -> Vec<u16> {
        (0..self.count)
            .map_while(|offset| self.base.checked_add(offset))
            .collect()
    }
}

/// SSH transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshConfig {
    /// Login user reported as node credentials; `None` means the default
    /// account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Private key; when absent the ssh agent / default identities are used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
    /// Dedicated known_hosts file; nodes are ephemeral and must not pollute
    /// the user's own file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_hosts_file: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: None,
            identity_file: None,
            port: 22,
            connect_timeout_secs: 10,
            command_timeout_secs: 30,
            known_hosts_file: None,
        }
    }
}

/// A pre-provisioned host leased by the `static` provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticHost {
    pub id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns the first violated rule as a `ConfigError`.
pub fn validate_config(config: &TestnodeConfig) -> Result<(), ConfigError> {
    let ports = config.ports;
    let last = u32::from(ports.base) + u32::from(ports.count);
    if ports.count == 0 || ports.base == 0 || last - 1 > u32::from(u16::MAX) {
        return Err(ConfigError::InvalidPortRange {
            base: ports.base,
            count: ports.count,
        });
    }

    if !RUNTIME_PROCESS_RE.is_match(&config.runtime_process) {
        return Err(ConfigError::InvalidRuntimeProcess(
            config.runtime_process.clone(),
        ));
    }

    if config.provider == ProviderKind::Static {
        if config.static_hosts.is_empty() {
            return Err(ConfigError::NoStaticHosts);
        }
        let mut ids = HashSet::new();
        for host in &config.static_hosts {
            if !ids.insert(host.id.as_str()) {
                return Err(ConfigError::DuplicateStaticHost(host.id.clone()));
            }
        }
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────

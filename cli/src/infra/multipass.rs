//! Multipass-backed `MachineProvider`.
//!
//! `MultipassProvider<R>` routes all multipass CLI calls through a
//! `CommandRunner`, so tests can inject a recording runner without spawning
//! real processes. Each node is a local Ubuntu VM named after its node id.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use testnode_common::{LoginCredentials, NodeMetadata, NodeSpec, NodeStatus};

use crate::application::ports::{CommandRunner, MachineProvider};
use crate::domain::machine::resolve_user;
use crate::domain::naming::generate_node_id;
use crate::domain::ssh::{authorize_key_script, normalize_public_key};
use crate::domain::{ConfigError, ProviderError, TestnodeConfig};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::{
    OpenSshConnector, SshAuthenticator, SshSettings, default_public_key, public_key_path,
};

pub const MULTIPASS: &str = "multipass";

/// Infrastructure adapter that creates nodes as Multipass instances.
///
/// A fresh instance only trusts Multipass's own key, so the login user's
/// public key is installed with `multipass exec` before the node is handed
/// out.
pub struct MultipassProvider<R: CommandRunner> {
    runner: R,
    launch_timeout: Duration,
    ports: Vec<u16>,
    credentials: Option<LoginCredentials>,
    /// Public key installed for the login user on every new instance.
    authorized_key: Option<PathBuf>,
    auth: SshAuthenticator,
    connector: OpenSshConnector<R>,
}

impl<R: CommandRunner + Clone> MultipassProvider<R> {
    /// Create a provider that runs multipass and ssh through `runner`.
    ///
    /// The key to install is `<ssh.identity_file>.pub` when an identity file
    /// is configured.
    pub fn new(runner: R, config: &TestnodeConfig) -> Self {
        let settings = SshSettings::from(&config.ssh);
        Self {
            connector: OpenSshConnector::new(runner.clone(), settings),
            runner,
            launch_timeout: Duration::from_secs(config.launch_timeout_secs),
            ports: config.ports.ports(),
            credentials: config
                .ssh
                .user
                .clone()
                .map(|user| LoginCredentials { user }),
            authorized_key: config.ssh.identity_file.as_deref().map(public_key_path),
            auth: SshAuthenticator::from_config(&config.ssh),
        }
    }

    /// Install `path` instead of the key derived from the config.
    #[must_use]
    pub fn with_authorized_key(mut self, path: Option<PathBuf>) -> Self {
        self.authorized_key = path;
        self
    }
}

impl MultipassProvider<TokioCommandRunner> {
    /// Convenience constructor for production use.
    ///
    /// Without an identity file the first default key in `~/.ssh` is
    /// installed, matching what the ssh agent offers.
    #[must_use]
    pub fn from_config(config: &TestnodeConfig) -> Self {
        let runner =
            TokioCommandRunner::new(Duration::from_secs(config.ssh.command_timeout_secs));
        let provider = Self::new(runner, config);
        if provider.authorized_key.is_some() {
            return provider;
        }
        provider.with_authorized_key(default_public_key())
    }
}

impl<R: CommandRunner> MultipassProvider<R> {
    /// Query `multipass info` for `node_id` and build its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is unknown, the output is not the
    /// expected JSON, or no IPv4 address has been assigned yet.
    pub async fn describe(&self, node_id: &str) -> Result<NodeMetadata, ProviderError> {
        let output = self
            .runner
            .run(MULTIPASS, &["info", node_id, "--format", "json"])
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{e:#}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("does not exist") {
                return Err(ProviderError::UnknownNode(node_id.to_string()));
            }
            return Err(ProviderError::CommandFailed {
                action: "multipass info".to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProviderError::InvalidResponse(format!("multipass info: {e}")))?;
        let instance = info
            .get("info")
            .and_then(|i| i.get(node_id))
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!("no entry for {node_id} in multipass info"))
            })?;

        let public_addresses: Vec<String> = instance
            .get("ipv4")
            .and_then(|arr| arr.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if public_addresses.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "no IPv4 address found for {node_id}"
            )));
        }
        let state = instance
            .get("state")
            .and_then(|s| s.as_str())
            .unwrap_or("Unknown");

        Ok(NodeMetadata {
            id: node_id.to_string(),
            public_addresses,
            credentials: self.credentials.clone(),
            status: NodeStatus::from_provider_state(state),
            created_at: Utc::now(),
        })
    }

    /// Normalized public key to install, read before anything is launched.
    ///
    /// A node with a cloud-init file may authorize keys itself, so a missing
    /// key is only an error without one.
    fn login_key(&self, spec: &NodeSpec) -> Result<Option<String>, ProviderError> {
        let Some(path) = &self.authorized_key else {
            return match spec.cloud_init {
                Some(_) => Ok(None),
                None => Err(ProviderError::NoLoginKey),
            };
        };
        let line = std::fs::read_to_string(path).map_err(|e| ProviderError::LoginKey {
            path: path.display().to_string(),
            source: ConfigError::InvalidPublicKey(e.to_string()),
        })?;
        normalize_public_key(&line)
            .map(Some)
            .map_err(|source| ProviderError::LoginKey {
                path: path.display().to_string(),
                source,
            })
    }

    async fn launch_and_describe(
        &self,
        node_id: &str,
        spec: &NodeSpec,
        key: Option<&str>,
    ) -> Result<NodeMetadata, ProviderError> {
        self.launch(node_id, spec).await?;
        if let Some(key) = key {
            self.install_key(node_id, key).await?;
        }
        self.describe(node_id).await
    }

    async fn launch(&self, node_id: &str, spec: &NodeSpec) -> Result<(), ProviderError> {
        let timeout = self.launch_timeout.as_secs().to_string();
        let cloud_init = spec.cloud_init.as_deref().map(Path::to_string_lossy);
        let mut args = vec![
            "launch",
            spec.image.as_str(),
            "--name",
            node_id,
            "--cpus",
            spec.cpus.as_str(),
            "--memory",
            spec.memory.as_str(),
            "--disk",
            spec.disk.as_str(),
            "--timeout",
            timeout.as_str(),
        ];
        if let Some(path) = cloud_init.as_deref() {
            args.push("--cloud-init");
            args.push(path);
        }

        tracing::info!(node_id, image = %spec.image, "launching multipass instance");
        let output = self
            .runner
            .run_with_timeout(MULTIPASS, &args, self.launch_timeout)
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{e:#}")))?;
        if !output.status.success() {
            return Err(ProviderError::CommandFailed {
                action: "multipass launch".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Append `key` to the login user's `authorized_keys` on the instance.
    async fn install_key(&self, node_id: &str, key: &str) -> Result<(), ProviderError> {
        let user = resolve_user(self.credentials.as_ref());
        let script = authorize_key_script(key);
        let output = self
            .runner
            .run(
                MULTIPASS,
                &["exec", node_id, "--", "sudo", "-H", "-u", user, "bash", "-c", &script],
            )
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{e:#}")))?;
        if !output.status.success() {
            return Err(ProviderError::CommandFailed {
                action: format!("authorizing login key for {user}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::debug!(node_id, user, "login key installed");
        Ok(())
    }

    async fn delete(&self, node_id: &str) -> Result<(), ProviderError> {
        let output = self
            .runner
            .run(MULTIPASS, &["delete", "--purge", node_id])
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{e:#}")))?;
        if output.status.success() {
            tracing::info!(node_id, "multipass instance deleted");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not exist") {
            return Err(ProviderError::UnknownNode(node_id.to_string()));
        }
        Err(ProviderError::CommandFailed {
            action: "multipass delete".to_string(),
            stderr: stderr.trim().to_string(),
        })
    }

    /// Remove an instance whose creation failed part way. The instance may
    /// exist even when `launch` itself failed or timed out.
    async fn discard(&self, node_id: &str) {
        match self.delete(node_id).await {
            Ok(()) => {}
            Err(ProviderError::UnknownNode(_)) => {
                tracing::debug!(node_id, "no instance left behind by failed launch");
            }
            Err(e) => {
                tracing::warn!(node_id, error = %e, "failed to delete instance after failed launch");
            }
        }
    }
}

impl<R: CommandRunner + Clone> MachineProvider for MultipassProvider<R> {
    type Connector = OpenSshConnector<R>;
    type Auth = SshAuthenticator;

    async fn create_node(&self, spec: &NodeSpec) -> Result<NodeMetadata, ProviderError> {
        let key = self.login_key(spec)?;
        let node_id = generate_node_id();
        match self.launch_and_describe(&node_id, spec, key.as_deref()).await {
            Ok(node) => Ok(node),
            Err(e) => {
                self.discard(&node_id).await;
                Err(e)
            }
        }
    }

    fn available_inbound_ports(&self) -> Vec<u16> {
        self.ports.clone()
    }

    fn authenticator(&self) -> &SshAuthenticator {
        &self.auth
    }

    fn connector(&self) -> &OpenSshConnector<R> {
        &self.connector
    }

    async fn destroy(&self, node_id: &str) -> Result<(), ProviderError> {
        self.delete(node_id).await
    }
}

//! The `Machine` aggregate: one provider node, one working directory on it,
//! and one pool of inbound ports.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use testnode_common::NodeMetadata;
use tracing::{debug, info, warn};

use crate::application::ports::{Authenticator, MachineProvider, RemoteSession, SessionConnector};
use crate::domain::machine::{
    DEFAULT_RUNTIME_PROCESS, MachineState, REMOVE_ARTIFACTS_COMMAND, create_dir_command,
    in_dir_command, kill_runtime_command, resolve_user,
};
use crate::domain::naming::{new_dir_suffix, working_dir_name};
use crate::domain::{MachineError, PortPool, RemoteOutput, SessionError};

/// Session type opened by a provider's connector.
pub type SessionOf<P> = <<P as MachineProvider>::Connector as SessionConnector>::Session;

/// Per-machine settings that do not come from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineOptions {
    /// Process name terminated on `reset`.
    pub runtime_process: String,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            runtime_process: DEFAULT_RUNTIME_PROCESS.to_string(),
        }
    }
}

/// A ready-to-use remote execution environment.
///
/// A `Machine` has a single owner: allocating ports and closing take
/// `&mut self`. Wrap it in a lock to share it between tasks.
pub struct Machine<'p, P: MachineProvider> {
    provider: &'p P,
    node: NodeMetadata,
    host: String,
    dir: String,
    ports: PortPool,
    runtime_process: String,
    state: MachineState,
}

impl<'p, P: MachineProvider> Machine<'p, P> {
    /// Wrap an existing node with default options.
    ///
    /// # Errors
    ///
    /// See [`Machine::with_options`].
    pub async fn new(provider: &'p P, node: NodeMetadata) -> Result<Self, MachineError> {
        Self::with_options(provider, node, MachineOptions::default()).await
    }

    /// Wrap an existing node: seed the port pool from the provider's grant,
    /// pick a working directory, and create it on the node.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::Setup` if the node has no public address, the
    /// session cannot be opened, or the directory cannot be created. No
    /// machine is returned in that case.
    pub async fn with_options(
        provider: &'p P,
        node: NodeMetadata,
        options: MachineOptions,
    ) -> Result<Self, MachineError> {
        let Some(host) = node.primary_address().map(str::to_string) else {
            return Err(MachineError::Setup {
                node_id: node.id.clone(),
                reason: "node has no public address".to_string(),
                source: None,
            });
        };

        let machine = Self {
            provider,
            ports: PortPool::new(provider.available_inbound_ports()),
            dir: working_dir_name(new_dir_suffix()),
            runtime_process: options.runtime_process,
            state: MachineState::Ready,
            host,
            node,
        };

        let session = machine
            .open_session()
            .await
            .map_err(|source| machine.setup_error("failed to create ssh connection", source))?;
        let output = session
            .execute_remote_command(&create_dir_command(&machine.dir))
            .await
            .map_err(|source| machine.setup_error("failed to create working directory", source))?;
        if !output.success() {
            return Err(MachineError::Setup {
                node_id: machine.node.id.clone(),
                reason: format!(
                    "failed to create working directory {}: {}",
                    machine.dir,
                    output.failure_reason()
                ),
                source: None,
            });
        }

        info!(
            node_id = %machine.node.id,
            host = %machine.host,
            dir = %machine.dir,
            ports = machine.ports.granted(),
            "machine ready"
        );
        Ok(machine)
    }

    /// Open a fresh authenticated session to the node.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::Setup` on transport or authentication failure,
    /// or `MachineError::Closed` after [`Machine::close`]. Not retried.
    pub async fn connect(&self) -> Result<SessionOf<P>, MachineError> {
        self.ensure_open()?;
        self.open_session()
            .await
            .map_err(|source| self.setup_error("failed to create ssh connection", source))
    }

    /// Run `command` inside the working directory on a fresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the transport
    /// fails. A nonzero exit status is returned in the output.
    pub async fn run_in_dir(&self, command: &str) -> Result<RemoteOutput, MachineError> {
        let session = self.connect().await?;
        Ok(session
            .execute_remote_command(&in_dir_command(&self.dir, command))
            .await?)
    }

    #[must_use]
    pub fn public_ip_address(&self) -> &str {
        &self.host
    }

    /// Login user: the credential user, or `ubuntu` when the provider gave
    /// no credentials.
    #[must_use]
    pub fn user(&self) -> &str {
        resolve_user(self.node.credentials.as_ref())
    }

    #[must_use]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    #[must_use]
    pub fn node(&self) -> &NodeMetadata {
        &self.node
    }

    #[must_use]
    pub fn state(&self) -> MachineState {
        self.state
    }

    #[must_use]
    pub fn remaining_ports(&self) -> usize {
        self.ports.remaining()
    }

    /// Hand out a port that this machine has never returned before.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::PoolExhausted` when every granted port is in
    /// use, or `MachineError::Closed` after [`Machine::close`].
    pub fn get_next_available_port(&mut self) -> Result<u16, MachineError> {
        self.ensure_open()?;
        let port = self.ports.take()?;
        debug!(node_id = %self.node.id, port, remaining = self.ports.remaining(), "port allocated");
        Ok(port)
    }

    /// Best-effort cleanup for reuse: remove machine artifacts, terminate the
    /// test runtime, and recreate the working directory.
    ///
    /// The port pool is not replenished.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::Reset` if artifacts cannot be removed or the
    /// directory cannot be recreated. A runtime kill that exits nonzero
    /// (nothing running) is logged and ignored.
    pub async fn reset(&self) -> Result<(), MachineError> {
        self.ensure_open()?;
        info!(node = %self.node, "resetting node");
        let session = self
            .open_session()
            .await
            .map_err(|source| self.reset_error("failed to create ssh connection", Some(source)))?;

        let removed = session
            .execute_remote_command(REMOVE_ARTIFACTS_COMMAND)
            .await
            .map_err(|source| self.reset_error("failed to remove machine artifacts", Some(source)))?;
        if !removed.success() {
            return Err(self.reset_error(
                &format!("failed to remove machine artifacts: {}", removed.failure_reason()),
                None,
            ));
        }

        let killed = session
            .execute_remote_command(&kill_runtime_command(&self.runtime_process))
            .await
            .map_err(|source| self.reset_error("failed to kill runtime processes", Some(source)))?;
        if killed.success() {
            debug!(node_id = %self.node.id, process = %self.runtime_process, "runtime processes killed");
        } else {
            warn!(
                node_id = %self.node.id,
                process = %self.runtime_process,
                reason = %killed.failure_reason(),
                "failed to kill runtime processes"
            );
        }

        let recreated = session
            .execute_remote_command(&create_dir_command(&self.dir))
            .await
            .map_err(|source| self.reset_error("failed to recreate working directory", Some(source)))?;
        if !recreated.success() {
            return Err(self.reset_error(
                &format!(
                    "failed to recreate working directory {}: {}",
                    self.dir,
                    recreated.failure_reason()
                ),
                None,
            ));
        }
        Ok(())
    }

    /// Destroy the backing node.
    ///
    /// The first successful call moves the machine to `Closed`; later calls
    /// return `Ok(())` without contacting the provider. A failed destroy
    /// leaves the machine usable so the caller may retry.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::Destroy` if the provider cannot destroy the node.
    pub async fn close(&mut self) -> Result<(), MachineError> {
        if self.state == MachineState::Closed {
            debug!(node_id = %self.node.id, "machine already closed");
            return Ok(());
        }
        info!(node = %self.node, "destroying node");
        self.provider
            .destroy(&self.node.id)
            .await
            .map_err(|source| MachineError::Destroy {
                node_id: self.node.id.clone(),
                source,
            })?;
        self.state = MachineState::Closed;
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────────────

    async fn open_session(&self) -> Result<SessionOf<P>, SessionError> {
        let connector = self.provider.connector();
        let mut connection = connector.connection(&self.host, self.user());
        self.provider.authenticator().authenticate(&mut connection)?;
        connector.open(connection).await
    }

    fn ensure_open(&self) -> Result<(), MachineError> {
        if self.state == MachineState::Closed {
            return Err(MachineError::Closed {
                node_id: self.node.id.clone(),
            });
        }
        Ok(())
    }

    fn setup_error(&self, reason: &str, source: SessionError) -> MachineError {
        MachineError::Setup {
            node_id: self.node.id.clone(),
            reason: reason.to_string(),
            source: Some(source),
        }
    }

    fn reset_error(&self, reason: &str, source: Option<SessionError>) -> MachineError {
        MachineError::Reset {
            node_id: self.node.id.clone(),
            reason: reason.to_string(),
            source,
        }
    }
}

//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `testnode_common`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use testnode_common::{NodeMetadata, NodeSpec};

use crate::domain::{ProviderError, RemoteOutput, SessionError, TestnodeConfig};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Remote Shell Ports ────────────────────────────────────────────────────────

/// An authenticated channel to one host.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// Run `command` on the host and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` only for transport-level failures. A command
    /// that exits nonzero is reported through `RemoteOutput::status`.
    async fn execute_remote_command(&self, command: &str) -> Result<RemoteOutput, SessionError>;
}

/// Applies authentication material to a not-yet-opened connection `C`.
///
/// The credential type is opaque to callers; they only ask the provider's
/// authenticator to authenticate a connection.
pub trait Authenticator<C> {
    /// # Errors
    ///
    /// Returns `SessionError::Auth` if the material cannot be applied.
    fn authenticate(&self, connection: &mut C) -> Result<(), SessionError>;
}

/// Opens remote shell sessions.
#[allow(async_fn_in_trait)]
pub trait SessionConnector {
    /// Connection description built from host and user, before
    /// authentication.
    type Connection;
    type Session: RemoteSession;

    fn connection(&self, host: &str, user: &str) -> Self::Connection;

    /// Establish the transport for an authenticated connection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the host is unreachable or rejects the
    /// credentials.
    async fn open(&self, connection: Self::Connection) -> Result<Self::Session, SessionError>;
}

// ── Machine Provider Port ─────────────────────────────────────────────────────

/// Creates, describes, and destroys nodes.
#[allow(async_fn_in_trait)]
pub trait MachineProvider {
    type Connector: SessionConnector;
    type Auth: Authenticator<<Self::Connector as SessionConnector>::Connection>;

    /// Create a node and wait until it reports its public address.
    async fn create_node(&self, spec: &NodeSpec) -> Result<NodeMetadata, ProviderError>;

    /// Inbound ports every node of this provider accepts, in grant order.
    fn available_inbound_ports(&self) -> Vec<u16>;

    fn authenticator(&self) -> &Self::Auth;

    fn connector(&self) -> &Self::Connector;

    /// Destroy the node with the given identifier.
    async fn destroy(&self, node_id: &str) -> Result<(), ProviderError>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration loading.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<TestnodeConfig>;

    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if no explicit path is set and the home directory
    /// cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}

//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Session errors ────────────────────────────────────────────────────────────

/// Transport-level failures of a remote shell session.
///
/// A command that ran and exited nonzero is *not* a `SessionError`; it is an
/// `Ok(RemoteOutput)` whose status the caller inspects.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("SSH transport to {host} failed: {message}")]
    Transport { host: String, message: String },

    #[error("SSH authentication as {user}@{host} failed: {message}")]
    Auth {
        user: String,
        host: String,
        message: String,
    },
}

// ── Provider errors ───────────────────────────────────────────────────────────

/// Errors reported by a `MachineProvider` implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Node '{0}' is not known to this provider.")]
    UnknownNode(String),

    #[error("No free host left in the static host list.")]
    NoFreeHost,

    #[error("{action} failed: {stderr}")]
    CommandFailed { action: String, stderr: String },

    #[error("Provider backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),

    #[error(
        "No public key to authorize on new nodes: set ssh.identity_file, \
         create ~/.ssh/id_ed25519, or provide node.cloud_init."
    )]
    NoLoginKey,

    #[error("Cannot use login key {path}")]
    LoginKey {
        path: String,
        #[source]
        source: ConfigError,
    },
}

// ── Machine errors ────────────────────────────────────────────────────────────

/// Errors surfaced by the `Machine` aggregate.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Failed to set up machine on node '{node_id}': {reason}")]
    Setup {
        node_id: String,
        reason: String,
        #[source]
        source: Option<SessionError>,
    },

    #[error("No more free inbound ports ({granted} were granted by the provider).")]
    PoolExhausted { granted: usize },

    #[error("Failed to reset node '{node_id}': {reason}")]
    Reset {
        node_id: String,
        reason: String,
        #[source]
        source: Option<SessionError>,
    },

    #[error("Failed to destroy node '{node_id}'")]
    Destroy {
        node_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Machine on node '{node_id}' is closed.")]
    Closed { node_id: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port range: base {base} with count {count} must stay within 1..=65535")]
    InvalidPortRange { base: u16, count: u16 },

    #[error("Invalid runtime process name '{0}': must match ^[A-Za-z0-9._-]+$")]
    InvalidRuntimeProcess(String),

    #[error("Provider 'static' needs at least one entry in static_hosts.")]
    NoStaticHosts,

    #[error("Duplicate static host id '{0}'.")]
    DuplicateStaticHost(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

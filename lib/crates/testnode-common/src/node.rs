use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a provider-managed node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Suspended,
    Terminated,
    Unrecognized,
}

impl NodeStatus {
    /// Map a provider's free-form state string (e.g. Multipass `"Running"`,
    /// `"Starting"`, `"Deleted"`) onto a `NodeStatus`.
    #[must_use]
    pub fn from_provider_state(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "starting" | "restarting" | "pending" => Self::Pending,
            "stopped" | "suspended" | "suspending" => Self::Suspended,
            "deleted" | "terminated" => Self::Terminated,
            _ => Self::Unrecognized,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Terminated => "terminated",
            Self::Unrecognized => "unrecognized",
        };
        f.write_str(s)
    }
}

/// Login identity for a node.
///
/// Only the account name travels with the node. Key material stays with the
/// provider's authenticator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginCredentials {
    pub user: String,
}

/// Metadata of a node that already exists at the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeMetadata {
    /// Provider-assigned identifier, used as the key for destruction.
    pub id: String,
    /// Public addresses in provider order. The first one is used for SSH.
    pub public_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<LoginCredentials>,
    pub status: NodeStatus,
    pub created_at: DateTime<Utc>,
}

impl NodeMetadata {
    /// First public address, if the provider reported any.
    #[must_use]
    pub fn primary_address(&self) -> Option<&str> {
        self.public_addresses.first().map(String::as_str)
    }
}

impl fmt::Display for NodeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({})",
            self.id,
            self.public_addresses.join(", "),
            self.status
        )
    }
}

/// Launch parameters for a new node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeSpec {
    /// Image to launch, e.g. `"24.04"`.
    pub image: String,
    pub cpus: String,
    pub memory: String,
    pub disk: String,
    /// Optional cloud-init file that installs the SSH public key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<PathBuf>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            image: "24.04".to_string(),
            cpus: "2".to_string(),
            memory: "4G".to_string(),
            disk: "20G".to_string(),
            cloud_init: None,
        }
    }
}

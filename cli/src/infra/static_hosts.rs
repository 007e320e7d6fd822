//! `MachineProvider` over a fixed list of pre-provisioned hosts.
//!
//! "Creating" a node leases the next free host; "destroying" it returns the
//! lease. Nothing is done to the host itself beyond what `Machine` does over
//! SSH.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use testnode_common::{LoginCredentials, NodeMetadata, NodeSpec, NodeStatus};

use crate::application::ports::{CommandRunner, MachineProvider};
use crate::domain::{ProviderError, StaticHost, TestnodeConfig};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::{OpenSshConnector, SshAuthenticator, SshSettings};

pub struct StaticProvider<R: CommandRunner> {
    hosts: Vec<StaticHost>,
    leased: Mutex<HashSet<String>>,
    ports: Vec<u16>,
    default_user: Option<String>,
    auth: SshAuthenticator,
    connector: OpenSshConnector<R>,
}

impl<R: CommandRunner + Clone> StaticProvider<R> {
    pub fn new(runner: R, config: &TestnodeConfig) -> Self {
        Self {
            hosts: config.static_hosts.clone(),
            leased: Mutex::new(HashSet::new()),
            ports: config.ports.ports(),
            default_user: config.ssh.user.clone(),
            auth: SshAuthenticator::from_config(&config.ssh),
            connector: OpenSshConnector::new(runner, SshSettings::from(&config.ssh)),
        }
    }
}

impl StaticProvider<TokioCommandRunner> {
    #[must_use]
    pub fn from_config(config: &TestnodeConfig) -> Self {
        let runner =
            TokioCommandRunner::new(Duration::from_secs(config.ssh.command_timeout_secs));
        Self::new(runner, config)
    }
}

impl<R: CommandRunner> StaticProvider<R> {
    /// Number of hosts currently leased.
    pub fn leased_count(&self) -> usize {
        self.leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn metadata(&self, host: &StaticHost) -> NodeMetadata {
        let user = host.user.clone().or_else(|| self.default_user.clone());
        NodeMetadata {
            id: host.id.clone(),
            public_addresses: vec![host.address.clone()],
            credentials: user.map(|user| LoginCredentials { user }),
            status: NodeStatus::Running,
            created_at: Utc::now(),
        }
    }
}

impl<R: CommandRunner + Clone> MachineProvider for StaticProvider<R> {
    type Connector = OpenSshConnector<R>;
    type Auth = SshAuthenticator;

    async fn create_node(&self, _spec: &NodeSpec) -> Result<NodeMetadata, ProviderError> {
        let mut leased = self.leased.lock().unwrap_or_else(PoisonError::into_inner);
        let host = self
            .hosts
            .iter()
            .find(|h| !leased.contains(&h.id))
            .ok_or(ProviderError::NoFreeHost)?;
        leased.insert(host.id.clone());
        tracing::info!(node_id = %host.id, address = %host.address, "static host leased");
        Ok(self.metadata(host))
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
        if !self.hosts.iter().any(|h| h.id == node_id) {
            return Err(ProviderError::UnknownNode(node_id.to_string()));
        }
        let released = self
            .leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(node_id);
        tracing::info!(node_id, released, "static host returned");
        Ok(())
    }
}

//! Provisioning use case: create a node at the provider and wrap it in a
//! ready `Machine`.

use anyhow::{Context, Result};
use testnode_common::NodeSpec;
use tracing::{info, warn};

use crate::application::ports::MachineProvider;
use crate::application::services::machine::{Machine, MachineOptions};

/// Create a node and build a `Machine` on it.
///
/// If the machine cannot be set up, the freshly created node is destroyed
/// before the setup error is returned so that no node leaks.
///
/// # Errors
///
/// Returns an error if node creation or machine setup fails.
pub async fn provision<'p, P: MachineProvider>(
    provider: &'p P,
    spec: &NodeSpec,
    options: MachineOptions,
) -> Result<Machine<'p, P>> {
    let node = provider
        .create_node(spec)
        .await
        .context("failed to create node")?;
    info!(node = %node, "node created");

    let node_id = node.id.clone();
    match Machine::with_options(provider, node, options).await {
        Ok(machine) => Ok(machine),
        Err(setup) => {
            if let Err(e) = provider.destroy(&node_id).await {
                warn!(node_id = %node_id, error = %e, "failed to destroy node after setup failure");
            }
            Err(anyhow::Error::new(setup).context(format!("failed to set up node {node_id}")))
        }
    }
}

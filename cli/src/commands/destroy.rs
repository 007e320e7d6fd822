//! `testnode destroy <node-id>`: remove a node left behind by `run --keep`.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::MachineProvider;
use crate::domain::ProviderKind;
use crate::domain::naming::is_generated_node_id;
use crate::infra::multipass::MultipassProvider;
use crate::infra::static_hosts::StaticProvider;
use crate::output::json;

/// Arguments for the destroy command.
#[derive(Args)]
pub struct DestroyArgs {
    /// Node id printed by `testnode run --keep`
    pub node_id: String,

    /// Destroy a Multipass instance even if testnode did not name it
    #[arg(long)]
    pub force: bool,
}

/// Entry point for `testnode destroy`.
///
/// # Errors
///
/// Returns an error if the node id is refused or the provider cannot destroy
/// the node.
pub async fn run(app: &AppContext, args: &DestroyArgs) -> Result<()> {
    match app.config.provider {
        ProviderKind::Multipass => {
            check_node_id(&args.node_id, args.force)?;
            destroy(&MultipassProvider::from_config(&app.config), &args.node_id).await?;
        }
        ProviderKind::Static => {
            destroy(&StaticProvider::from_config(&app.config), &args.node_id).await?;
        }
    }

    if app.is_json() {
        let value = serde_json::json!({ "destroyed": args.node_id });
        println!("{}", json::format_value(&value)?);
    } else {
        app.output.success(&format!("Destroyed {}", args.node_id));
    }
    Ok(())
}

/// Refuse to delete Multipass instances that testnode did not create.
///
/// # Errors
///
/// Returns an error if `node_id` lacks the generated prefix and `force` is
/// not set.
pub fn check_node_id(node_id: &str, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || is_generated_node_id(node_id),
        "'{node_id}' was not created by testnode (use --force to destroy it anyway)"
    );
    Ok(())
}

async fn destroy(provider: &impl MachineProvider, node_id: &str) -> Result<()> {
    provider
        .destroy(node_id)
        .await
        .with_context(|| format!("failed to destroy node {node_id}"))
}

//! `testnode run`: provision a node and run one command on it.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use testnode_common::{NodeMetadata, NodeSpec};
use tracing::warn;

use crate::app::AppContext;
use crate::application::ports::MachineProvider;
use crate::application::services::{Machine, MachineOptions, provision};
use crate::domain::machine::shell_join;
use crate::domain::{ProviderKind, RemoteOutput};
use crate::infra::multipass::MultipassProvider;
use crate::infra::static_hosts::StaticProvider;
use crate::output::json;

/// Environment variable carrying the allocated ports to the remote command.
pub const PORTS_ENV: &str = "TESTNODE_PORTS";

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Number of inbound ports to allocate for the command
    #[arg(long, default_value_t = 0)]
    pub ports: usize,

    /// Leave the node running after the command finishes
    #[arg(long)]
    pub keep: bool,

    /// Command to run in the machine directory. A single argument is passed
    /// to the remote shell as-is; several arguments are quoted word by word.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Everything `run` learned about the node and the command.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub node: NodeMetadata,
    pub host: String,
    pub user: String,
    pub dir: String,
    pub ports: Vec<u16>,
    pub output: RemoteOutput,
    pub kept: bool,
}

/// Entry point for `testnode run`.
///
/// # Errors
///
/// Returns an error if provisioning fails, the port pool cannot cover
/// `--ports`, the transport fails, teardown fails, or the remote command
/// exits nonzero.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<()> {
    let options = MachineOptions {
        runtime_process: app.config.runtime_process.clone(),
    };
    let report = match app.config.provider {
        ProviderKind::Multipass => {
            let provider = MultipassProvider::from_config(&app.config);
            execute(&provider, &app.config.node, options, args).await?
        }
        ProviderKind::Static => {
            let provider = StaticProvider::from_config(&app.config);
            execute(&provider, &app.config.node, options, args).await?
        }
    };

    render(app, &report)?;

    if !report.output.success() {
        anyhow::bail!(
            "remote command failed on {}: {}",
            report.node.id,
            report.output.failure_reason()
        );
    }
    Ok(())
}

/// Provision a machine from `provider`, run the command, and tear the
/// machine down unless `--keep` was given.
///
/// Teardown runs even when the command could not be run. A failing reset is
/// logged and does not stop the node from being destroyed.
///
/// # Errors
///
/// Returns the first error from provisioning, running, or destroying.
pub async fn execute<P: MachineProvider>(
    provider: &P,
    spec: &NodeSpec,
    options: MachineOptions,
    args: &RunArgs,
) -> Result<RunReport> {
    let mut machine = provision(provider, spec, options).await?;
    let outcome = exercise(&mut machine, args).await;
    let teardown = if args.keep {
        Ok(())
    } else {
        teardown(&mut machine).await
    };

    match (outcome, teardown) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close)) => {
            warn!(node_id = %machine.node().id, error = %format!("{close:#}"), "teardown failed");
            Err(e)
        }
    }
}

async fn exercise<P: MachineProvider>(
    machine: &mut Machine<'_, P>,
    args: &RunArgs,
) -> Result<RunReport> {
    let ports = (0..args.ports)
        .map(|_| machine.get_next_available_port())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("cannot allocate {} ports", args.ports))?;

    let output = machine
        .run_in_dir(&remote_script(&ports, &args.command))
        .await
        .context("failed to run command")?;

    Ok(RunReport {
        node: machine.node().clone(),
        host: machine.public_ip_address().to_string(),
        user: machine.user().to_string(),
        dir: machine.dir().to_string(),
        ports,
        output,
        kept: args.keep,
    })
}

async fn teardown<P: MachineProvider>(machine: &mut Machine<'_, P>) -> Result<()> {
    if let Err(e) = machine.reset().await {
        warn!(node_id = %machine.node().id, error = %e, "reset failed, destroying anyway");
    }
    machine
        .close()
        .await
        .with_context(|| format!("failed to destroy node {}", machine.node().id))
}

/// Build the remote script: export the allocated ports, then run `command`.
#[must_use]
pub fn remote_script(ports: &[u16], command: &[String]) -> String {
    let ports = ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let command = match command {
        [single] => single.clone(),
        words => shell_join(words),
    };
    format!("export {PORTS_ENV}={ports} && {command}")
}

fn render(app: &AppContext, report: &RunReport) -> Result<()> {
    if app.is_json() {
        println!("{}", json::format_value(report)?);
        return Ok(());
    }

    let out = &app.output;
    out.node(
        &report.node,
        &format!("{}@{}", report.user, report.host),
        &report.dir,
    );
    out.ports(&report.ports);
    out.remote_streams(&report.output);
    if report.output.success() {
        out.success("command succeeded");
    }
    if report.kept {
        out.warn(&format!(
            "node kept; remove it with: testnode destroy {}",
            report.node.id
        ));
    }
    Ok(())
}

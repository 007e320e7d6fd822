//! OpenSSH-backed remote shell sessions.
//!
//! Every session shells out to the system `ssh` client through a
//! `CommandRunner`, one process per remote command. Sessions run in batch
//! mode so a missing key fails fast instead of prompting.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use crate::application::ports::{Authenticator, CommandRunner, RemoteSession, SessionConnector};
use crate::domain::{RemoteOutput, SessionError, SshConfig};

pub const SSH_PROGRAM: &str = "ssh";

/// Exit status the OpenSSH client reserves for its own errors.
pub const SSH_CLIENT_ERROR: i32 = 255;

/// Command run when a session is opened to prove the channel works.
const CHECK_COMMAND: &str = "true";

/// Transport settings shared by every connection a connector builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub port: u16,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub known_hosts_file: Option<PathBuf>,
}

impl From<&SshConfig> for SshSettings {
    fn from(config: &SshConfig) -> Self {
        Self {
            port: config.port,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            known_hosts_file: config.known_hosts_file.clone(),
        }
    }
}

/// Default identities, in the order `ssh` itself tries them.
const DEFAULT_PUBLIC_KEYS: &[&str] = &["id_ed25519.pub", "id_ecdsa.pub", "id_rsa.pub"];

/// Public half of a private key file: `<identity>.pub`.
#[must_use]
pub fn public_key_path(identity: &Path) -> PathBuf {
    let mut path = identity.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}

/// First default public key found in `~/.ssh`.
#[must_use]
pub fn default_public_key() -> Option<PathBuf> {
    let ssh_dir = dirs::home_dir()?.join(".ssh");
    DEFAULT_PUBLIC_KEYS
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.is_file())
}

// ── Connection ───────────────────────────────────────────────────────────────

/// Everything needed to invoke `ssh` against one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSshConnection {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<PathBuf>,
    /// `-o key=value` options in the order they are passed.
    pub options: Vec<(String, String)>,
}

impl OpenSshConnection {
    pub fn set_option(&mut self, key: &str, value: &str) {
        self.options.retain(|(k, _)| k != key);
        self.options.push((key.to_string(), value.to_string()));
    }

    /// Arguments for `ssh` running `command` on this host.
    #[must_use]
    pub fn args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-p".to_string(), self.port.to_string()];
        for (key, value) in &self.options {
            args.push("-o".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(key) = &self.identity_file {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().into_owned());
        }
        args.push(format!("{}@{}", self.user, self.host));
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }
}

// ── Authenticator ────────────────────────────────────────────────────────────

/// How `ssh` proves the user's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshAuthenticator {
    /// Use exactly this private key.
    KeyFile(PathBuf),
    /// Defer to the ssh agent and the client's default identities.
    Agent,
}

impl SshAuthenticator {
    #[must_use]
    pub fn from_config(config: &SshConfig) -> Self {
        config
            .identity_file
            .clone()
            .map_or(Self::Agent, Self::KeyFile)
    }
}

impl Authenticator<OpenSshConnection> for SshAuthenticator {
    fn authenticate(&self, connection: &mut OpenSshConnection) -> Result<(), SessionError> {
        match self {
            Self::KeyFile(path) => {
                if !path.is_file() {
                    return Err(SessionError::Auth {
                        user: connection.user.clone(),
                        host: connection.host.clone(),
                        message: format!("identity file {} not found", path.display()),
                    });
                }
                connection.identity_file = Some(path.clone());
                connection.set_option("IdentitiesOnly", "yes");
            }
            Self::Agent => {}
        }
        Ok(())
    }
}

// ── Connector and session ────────────────────────────────────────────────────

/// Builds connections and opens `OpenSshSession`s.
#[derive(Debug, Clone)]
pub struct OpenSshConnector<R> {
    runner: R,
    settings: SshSettings,
}

impl<R: CommandRunner + Clone> OpenSshConnector<R> {
    pub fn new(runner: R, settings: SshSettings) -> Self {
        Self { runner, settings }
    }
}

impl<R: CommandRunner + Clone> SessionConnector for OpenSshConnector<R> {
    type Connection = OpenSshConnection;
    type Session = OpenSshSession<R>;

    fn connection(&self, host: &str, user: &str) -> OpenSshConnection {
        let mut connection = OpenSshConnection {
            host: host.to_string(),
            user: user.to_string(),
            port: self.settings.port,
            identity_file: None,
            options: Vec::new(),
        };
        connection.set_option("BatchMode", "yes");
        connection.set_option(
            "ConnectTimeout",
            &self.settings.connect_timeout.as_secs().to_string(),
        );
        connection.set_option("LogLevel", "ERROR");
        match &self.settings.known_hosts_file {
            Some(path) => {
                connection.set_option("StrictHostKeyChecking", "accept-new");
                connection.set_option("UserKnownHostsFile", &path.to_string_lossy());
            }
            None => {
                // Node addresses are recycled by providers; pinning keys
                // would fail on the next node that reuses an address.
                connection.set_option("StrictHostKeyChecking", "no");
                connection.set_option("UserKnownHostsFile", "/dev/null");
            }
        }
        connection
    }

    async fn open(&self, connection: OpenSshConnection) -> Result<OpenSshSession<R>, SessionError> {
        let session = OpenSshSession {
            runner: self.runner.clone(),
            connection,
            timeout: self.settings.command_timeout,
        };
        let check = session.execute_remote_command(CHECK_COMMAND).await?;
        if !check.success() {
            return Err(SessionError::Transport {
                host: session.connection.host.clone(),
                message: format!("session check failed: {}", check.failure_reason()),
            });
        }
        tracing::debug!(
            host = %session.connection.host,
            user = %session.connection.user,
            "ssh session opened"
        );
        Ok(session)
    }
}

/// An authenticated `ssh` channel to one host.
#[derive(Debug)]
pub struct OpenSshSession<R> {
    runner: R,
    connection: OpenSshConnection,
    timeout: Duration,
}

impl<R> OpenSshSession<R> {
    #[must_use]
    pub fn connection(&self) -> &OpenSshConnection {
        &self.connection
    }
}

impl<R: CommandRunner> RemoteSession for OpenSshSession<R> {
    async fn execute_remote_command(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        let args = self.connection.args(command);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::debug!(host = %self.connection.host, command, "executing remote command");
        let output = self
            .runner
            .run_with_timeout(SSH_PROGRAM, &arg_refs, self.timeout)
            .await
            .map_err(|e| SessionError::Transport {
                host: self.connection.host.clone(),
                message: format!("{e:#}"),
            })?;
        remote_output(&self.connection, output)
    }
}

/// Classify a finished `ssh` process.
///
/// The client reports its own failures as status 255, and a remote command
/// that exits 255 is indistinguishable from them. Such a command is therefore
/// reported as a transport failure, not as `Ok` with status 255.
///
/// # Errors
///
/// Returns `SessionError` when the client itself failed (status 255).
pub fn remote_output(
    connection: &OpenSshConnection,
    output: Output,
) -> Result<RemoteOutput, SessionError> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    match output.status.code() {
        Some(SSH_CLIENT_ERROR) if stderr.contains("Permission denied") => Err(SessionError::Auth {
            user: connection.user.clone(),
            host: connection.host.clone(),
            message: stderr.trim().to_string(),
        }),
        Some(SSH_CLIENT_ERROR) => Err(SessionError::Transport {
            host: connection.host.clone(),
            message: stderr.trim().to_string(),
        }),
        status => Ok(RemoteOutput {
            status,
            stdout,
            stderr,
        }),
    }
}

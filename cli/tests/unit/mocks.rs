//! Shared mock infrastructure for unit tests.
//!
//! `ScriptedProvider` implements every port the `Machine` needs. It records
//! the commands sent to the node and answers them from a per-prefix script.

#![allow(clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::Utc;
use testnode_cli::application::ports::{
    Authenticator, MachineProvider, RemoteSession, SessionConnector,
};
use testnode_cli::domain::{ProviderError, RemoteOutput, SessionError};
use testnode_common::{LoginCredentials, NodeMetadata, NodeSpec, NodeStatus};

// ── Node helpers ──────────────────────────────────────────────────────────────

pub fn node_with(id: &str, credentials: Option<LoginCredentials>) -> NodeMetadata {
    NodeMetadata {
        id: id.to_string(),
        public_addresses: vec!["198.51.100.20".to_string(), "198.51.100.21".to_string()],
        credentials,
        status: NodeStatus::Running,
        created_at: Utc::now(),
    }
}

pub fn anonymous_node() -> NodeMetadata {
    node_with("testnode-00000000000000aa", None)
}

// ── Script ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Script {
    executed: RefCell<Vec<String>>,
    statuses: RefCell<Vec<(String, i32)>>,
    sessions: Cell<usize>,
    logins: RefCell<Vec<String>>,
}

impl Script {
    fn status_for(&self, command: &str) -> i32 {
        self.statuses
            .borrow()
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map_or(0, |(_, status)| *status)
    }
}

// ── Ports ─────────────────────────────────────────────────────────────────────

pub struct Login {
    host: String,
    user: String,
    token: Option<&'static str>,
}

pub struct TokenAuth;

impl Authenticator<Login> for TokenAuth {
    fn authenticate(&self, login: &mut Login) -> Result<(), SessionError> {
        login.token = Some("secret");
        Ok(())
    }
}

pub struct ScriptedConnector(Rc<Script>);

impl SessionConnector for ScriptedConnector {
    type Connection = Login;
    type Session = ScriptedSession;

    fn connection(&self, host: &str, user: &str) -> Login {
        Login {
            host: host.to_string(),
            user: user.to_string(),
            token: None,
        }
    }

    async fn open(&self, login: Login) -> Result<ScriptedSession, SessionError> {
        if login.token.is_none() {
            return Err(SessionError::Auth {
                user: login.user,
                host: login.host,
                message: "no credentials applied".to_string(),
            });
        }
        self.0.sessions.set(self.0.sessions.get() + 1);
        self.0
            .logins
            .borrow_mut()
            .push(format!("{}@{}", login.user, login.host));
        Ok(ScriptedSession(Rc::clone(&self.0)))
    }
}

pub struct ScriptedSession(Rc<Script>);

impl RemoteSession for ScriptedSession {
    async fn execute_remote_command(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        self.0.executed.borrow_mut().push(command.to_string());
        let status = self.0.status_for(command);
        Ok(RemoteOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: if status == 0 {
                String::new()
            } else {
                format!("exit {status}")
            },
        })
    }
}

// ── Provider ──────────────────────────────────────────────────────────────────

pub struct ScriptedProvider {
    ports: Vec<u16>,
    script: Rc<Script>,
    connector: ScriptedConnector,
    destroyed: RefCell<Vec<String>>,
    destroy_failures: Cell<usize>,
}

impl ScriptedProvider {
    pub fn with_ports(ports: &[u16]) -> Self {
        let script = Rc::new(Script::default());
        Self {
            ports: ports.to_vec(),
            connector: ScriptedConnector(Rc::clone(&script)),
            script,
            destroyed: RefCell::new(Vec::new()),
            destroy_failures: Cell::new(0),
        }
    }

    /// Commands starting with `prefix` exit with `status`.
    pub fn exit_status(&self, prefix: &str, status: i32) {
        self.script
            .statuses
            .borrow_mut()
            .push((prefix.to_string(), status));
    }

    /// The next `count` destroy calls fail.
    pub fn fail_destroys(&self, count: usize) {
        self.destroy_failures.set(count);
    }

    pub fn executed(&self) -> Vec<String> {
        self.script.executed.borrow().clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.script.sessions.get()
    }

    pub fn logins(&self) -> Vec<String> {
        self.script.logins.borrow().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.borrow().clone()
    }
}

impl MachineProvider for ScriptedProvider {
    type Connector = ScriptedConnector;
    type Auth = TokenAuth;

    async fn create_node(&self, _: &NodeSpec) -> Result<NodeMetadata, ProviderError> {
        Ok(anonymous_node())
    }

    fn available_inbound_ports(&self) -> Vec<u16> {
        self.ports.clone()
    }

    fn authenticator(&self) -> &TokenAuth {
        &TokenAuth
    }

    fn connector(&self) -> &ScriptedConnector {
        &self.connector
    }

    async fn destroy(&self, node_id: &str) -> Result<(), ProviderError> {
        let failures = self.destroy_failures.get();
        if failures > 0 {
            self.destroy_failures.set(failures - 1);
            return Err(ProviderError::Unavailable("api rate limited".to_string()));
        }
        self.destroyed.borrow_mut().push(node_id.to_string());
        Ok(())
    }
}

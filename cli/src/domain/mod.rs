//! Domain layer: pure types and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod machine;
pub mod naming;
pub mod port_pool;
pub mod session;
pub mod ssh;

pub use config::{ProviderKind, SshConfig, StaticHost, TestnodeConfig, validate_config};
pub use error::{ConfigError, MachineError, ProviderError, SessionError};
pub use machine::MachineState;
pub use port_pool::{BEGINNING_PORT, PortPool};
pub use session::RemoteOutput;

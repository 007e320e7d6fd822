//! Command implementations

pub mod config;
pub mod destroy;
pub mod run;

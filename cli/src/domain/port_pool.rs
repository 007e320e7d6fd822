//! Per-machine pool of inbound ports.
//!
//! Ports are handed out at most once. There is no release: a port taken by
//! one test stays taken for the life of the machine.

use std::collections::HashSet;

use crate::domain::error::MachineError;

/// First port of the conventional inbound range granted to test nodes.
pub const BEGINNING_PORT: u16 = 20000;

/// Stack of not-yet-issued ports, seeded once from the provider's grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPool {
    available: Vec<u16>,
    granted: usize,
}

impl PortPool {
    /// Seed the pool from the provider-granted ports, preserving order.
    ///
    /// Duplicates are collapsed (first occurrence wins) so no port can be
    /// issued twice even if the grant repeats one.
    #[must_use]
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        let mut seen = HashSet::new();
        let available: Vec<u16> = ports.into_iter().filter(|p| seen.insert(*p)).collect();
        Self {
            granted: available.len(),
            available,
        }
    }

    /// Contiguous grant `[base, base + count)`, truncated at `u16::MAX`.
    #[must_use]
    pub fn from_range(base: u16, count: u16) -> Self {
        Self::new((0..count).map_while(|offset| base.checked_add(offset)))
    }

    /// Take the most recently added port that has not been issued yet.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::PoolExhausted` once every granted port has been
    /// issued.
    pub fn take(&mut self) -> Result<u16, MachineError> {
        self.available.pop().ok_or(MachineError::PoolExhausted {
            granted: self.granted,
        })
    }

    /// Number of ports still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    /// Number of distinct ports in the original grant.
    #[must_use]
    pub fn granted(&self) -> usize {
        self.granted
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

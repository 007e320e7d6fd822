//! Identifier and directory naming for machines and nodes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::machine::WORKING_DIR_PREFIX;

/// Upper bound of a directory suffix; keeps suffixes in the non-negative
/// `i32` range so they read the same in any tool that parses them.
pub const MAX_DIR_SUFFIX: u32 = i32::MAX.unsigned_abs();

/// Node identifier prefix for nodes launched by testnode.
pub const NODE_ID_PREFIX: &str = "testnode-";

/// Draw a collision-resistant working-directory suffix.
///
/// Each call seeds a fresh generator from OS entropy; there is no shared
/// generator state between machines.
#[must_use]
pub fn new_dir_suffix() -> u32 {
    StdRng::from_os_rng().random_range(0..=MAX_DIR_SUFFIX)
}

/// Working directory for a machine: `./machine_home_<suffix>`.
#[must_use]
pub fn working_dir_name(suffix: u32) -> String {
    format!("{WORKING_DIR_PREFIX}{suffix}")
}

/// Generate a unique node identifier.
///
/// Format: `testnode-` followed by 16 lowercase hex characters.
#[must_use]
pub fn generate_node_id() -> String {
    let value: u64 = StdRng::from_os_rng().random();
    format!("{NODE_ID_PREFIX}{value:016x}")
}

/// Returns `true` if `id` looks like an identifier produced by
/// [`generate_node_id`].
#[must_use]
pub fn is_generated_node_id(id: &str) -> bool {
    id.strip_prefix(NODE_ID_PREFIX)
        .is_some_and(|hex| hex.len() == 16 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

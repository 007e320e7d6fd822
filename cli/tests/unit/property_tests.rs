//! Property-based tests for the port pool and generated names.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use std::collections::HashSet;

use proptest::prelude::*;

use testnode_cli::domain::PortPool;
use testnode_cli::domain::machine::shell_quote;
use testnode_cli::domain::naming::{
    MAX_DIR_SUFFIX, generate_node_id, is_generated_node_id, new_dir_suffix, working_dir_name,
};

// ============================================================================
// PortPool property tests
// ============================================================================

proptest! {
    /// Every distinct granted port is handed out exactly once, then the pool
    /// is exhausted.
    #[test]
    fn prop_pool_hands_out_each_port_once(ports in prop::collection::vec(1u16..=u16::MAX, 0..64)) {
        let distinct: HashSet<u16> = ports.iter().copied().collect();
        let mut pool = PortPool::new(ports);

        let mut seen = HashSet::new();
        while let Ok(port) = pool.take() {
            prop_assert!(seen.insert(port), "port {} handed out twice", port);
        }
        prop_assert_eq!(seen, distinct);
        prop_assert!(pool.is_empty());
        prop_assert!(pool.take().is_err());
    }

    /// A range pool holds exactly `count` ports starting at `base`.
    #[test]
    fn prop_range_pool_covers_range(base in 1024u16..60000, count in 0u16..200) {
        let mut pool = PortPool::from_range(base, count);
        prop_assert_eq!(pool.remaining(), usize::from(count));
        while let Ok(port) = pool.take() {
            prop_assert!(port >= base && port < base + count);
        }
    }
}

// ============================================================================
// Naming property tests
// ============================================================================

proptest! {
    /// Working directory names embed the suffix after the fixed prefix.
    #[test]
    fn prop_dir_name_embeds_suffix(suffix in 0..=MAX_DIR_SUFFIX) {
        let name = working_dir_name(suffix);
        prop_assert!(name.starts_with("./machine_home_"));
        prop_assert_eq!(name["./machine_home_".len()..].parse::<u32>().ok(), Some(suffix));
    }

    /// Quoting never lets a single quote through unescaped.
    #[test]
    fn prop_quoted_words_are_single_shell_words(word in "[ -~]{0,40}") {
        let quoted = shell_quote(&word);
        if quoted.starts_with('\'') {
            prop_assert!(quoted.ends_with('\''));
            let unescaped = quoted.replace(r"'\''", "");
            prop_assert_eq!(unescaped.trim_matches('\''), word.replace('\'', ""));
        } else {
            prop_assert!(!quoted.contains(' '));
            prop_assert!(!word.is_empty());
        }
    }
}

#[test]
fn test_dir_suffix_stays_in_range() {
    for _ in 0..1000 {
        assert!(new_dir_suffix() <= MAX_DIR_SUFFIX);
    }
}

#[test]
fn test_node_id_uniqueness_batch() {
    let ids: HashSet<_> = (0..100).map(|_| generate_node_id()).collect();
    assert_eq!(ids.len(), 100, "duplicate IDs generated");
    assert!(ids.iter().all(|id| is_generated_node_id(id)));
}

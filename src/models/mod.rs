//! Domain models for the IPAM engine.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Cidr`] - IPv4/IPv6 network with address primitives
//! - [`Block`] and [`Subnet`] - the managed address hierarchy
//! - [`Pattern`] and [`Target`] - allocation templates and file selection

mod block;
mod cidr;
mod pattern;

// Re-export public types
pub use block::{Block, Subnet};
pub use cidr::{
    address_count, compare_address, contains, contains_cidr, family_bits, last_address,
    next_address, overlaps, prefix_mask, saturating_u64, Cidr, IPV4_BITS, IPV6_BITS,
};
pub(crate) use cidr::{alignment_prefix, from_bits, host_mask, to_bits};
pub use pattern::{fill_pattern_names, Pattern, PatternTable, Patterns, Target};

/// Every block collection managed together, by file key.
pub type BlockFiles = std::collections::BTreeMap<String, Vec<Block>>;

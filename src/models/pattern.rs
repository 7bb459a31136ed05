//! Allocation patterns and target selection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named template for carving subnets out of a block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    /// Pattern name. The map key in the config file is authoritative.
    #[serde(default, skip_serializing)]
    pub name: String,
    /// Prefix length of the subnets to carve.
    pub cidr_size: u8,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub region: String,
    /// CIDR of the block to allocate from.
    pub block: String,
}

/// Patterns of one file key, by name.
pub type Patterns = BTreeMap<String, Pattern>;

/// Patterns of every file key.
pub type PatternTable = BTreeMap<String, Patterns>;

/// Which block files an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Specific(String),
    All,
}

impl Target {
    /// `None` or an empty key means every file.
    pub fn from_key(key: Option<&str>) -> Target {
        match key {
            Some(k) if !k.trim().is_empty() => Target::Specific(k.trim().to_string()),
            _ => Target::All,
        }
    }
}

/// Copy each map key into the pattern's `name` field.
pub fn fill_pattern_names(table: &mut PatternTable) {
    for patterns in table.values_mut() {
        for (name, pattern) in patterns.iter_mut() {
            pattern.name = name.clone();
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, CIDR Size: {}, Environment: {}, Region: {}, Block: {}",
            self.name, self.cidr_size, self.environment, self.region, self.block
        )
    }
}

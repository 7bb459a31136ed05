//! Address-space management for IP blocks.
//!
//! Blocks are top-level CIDR ranges, each holding the subnets allocated
//! from it. The engine finds free ranges, allocates subnets manually or from
//! patterns, reports utilization and validates whole block files.
//!
//! ```
//! use ipam_blocks::models::Block;
//! use ipam_blocks::processing::find_available;
//!
//! let block = Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.0/26", "app", "us-east1");
//! assert_eq!(find_available(&block).unwrap(), vec!["10.0.0.64/26", "10.0.0.128/25"]);
//! ```

pub mod cli;
pub mod error;
pub mod models;
pub mod output;
pub mod processing;
pub mod store;

pub use error::{IpamError, Result};

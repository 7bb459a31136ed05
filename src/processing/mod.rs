//! Address-space processing logic.
//!
//! This module contains the engine operations on blocks and subnets:
//! - [`gap_finder`] - Finding free ranges between subnets
//! - [`allocator`] - Manual and pattern-driven subnet creation
//! - [`utilization`] - Block utilization accounting
//! - [`validator`] - Consistency checks producing diagnostics
//! - [`inventory`] - Block, subnet and pattern management across files

mod allocator;
mod gap_finder;
mod inventory;
mod utilization;
pub mod validator;

// Re-export public functions
pub use allocator::{create_from_pattern, create_subnet, find_overlapping, Allocation};
pub use gap_finder::{
    block_layout, find_available, find_available_cidrs, range_to_cidrs, LayoutRow,
};
pub use inventory::{
    create_block, create_pattern, create_subnet_in, delete_block, delete_pattern, delete_subnet,
    find_block, find_subnet, get_pattern, list_subnets, resolve_target, BlockRef, SubnetEntry,
};
pub use utilization::{calculate, subnet_shares, SubnetShare, Utilization};
pub use validator::{
    validate, validate_all, validate_all_documents, validate_document, Category, Report, Severity,
    ValidationResult,
};

//! Output formatting for blocks, subnets and reports.
//!
//! This module handles formatting data for the terminal:
//! - [`report`] - Text rendering of each command's result
//! - [`terminal`] - Column-aligned tables

mod report;
mod terminal;

pub use report::{
    render_available, render_block, render_blocks, render_pattern, render_patterns, render_subnet,
    render_subnets, render_utilization, render_utilization_summary, render_validation,
    render_validation_summary,
};
pub use terminal::{format_field, Table};

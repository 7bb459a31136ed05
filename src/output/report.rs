//! Rendering of blocks, subnets, patterns and reports as text.
//!
//! Every function returns the text instead of printing it, the CLI decides
//! where it goes.

use super::terminal::{format_field, Table};
use crate::models::{Block, BlockFiles, Pattern, Patterns};
use crate::processing::{LayoutRow, Report, SubnetEntry, SubnetShare, Utilization};
use colored::Colorize;

const STAT_WIDTH: usize = 16;

/// Table of every block with its subnets, one row per subnet.
pub fn render_blocks(files: &BlockFiles) -> String {
    let mut table = Table::new(&["File", "Block CIDR", "Subnet CIDR", "Description"]);
    for (key, blocks) in files {
        for block in blocks {
            if block.subnets.is_empty() {
                table.add_row(vec![key.clone(), block.cidr.clone(), String::new(), block.description.clone()]);
            }
            for subnet in &block.subnets {
                table.add_row(vec![
                    key.clone(),
                    block.cidr.clone(),
                    subnet.cidr.clone(),
                    block.description.clone(),
                ]);
            }
        }
    }
    if table.is_empty() {
        return "No blocks found\n".to_string();
    }
    table.render()
}

/// Details of one block: description, utilization, then subnets and free
/// ranges in address order.
pub fn render_block(block: &Block, utilization: &Utilization, layout: &[LayoutRow<'_>]) -> String {
    let mut out = String::new();
    let mut header = Table::new(&["Block CIDR", "Description"]);
    header.add_row(vec![block.cidr.clone(), block.description.clone()]);
    out.push_str(&header.render());

    out.push_str("\nUtilization:\n");
    out.push_str(&render_stats(utilization));

    out.push_str("\nSubnets:\n");
    let mut subnets = Table::new(&["Subnet CIDR", "Name", "Region"]);
    for row in layout {
        match row {
            LayoutRow::Subnet(subnet) => {
                subnets.add_row(vec![subnet.cidr.clone(), subnet.name.clone(), subnet.region.clone()])
            }
            LayoutRow::Gap(gap) => subnets.add_row(vec![gap.to_string(), "(free)".to_string(), String::new()]),
        }
    }
    out.push_str(&subnets.render());
    out
}

/// Table of subnets with their parent block.
pub fn render_subnets(entries: &[SubnetEntry<'_>]) -> String {
    if entries.is_empty() {
        return "No subnets found.\n".to_string();
    }
    let mut table = Table::new(&["Block CIDR", "Subnet CIDR", "Name", "Region"]);
    for entry in entries {
        table.add_row(vec![
            entry.block.cidr.clone(),
            entry.subnet.cidr.clone(),
            entry.subnet.name.clone(),
            entry.subnet.region.clone(),
        ]);
    }
    table.render()
}

pub fn render_subnet(entry: &SubnetEntry<'_>) -> String {
    format!(
        "Subnet CIDR: {}\nName:        {}\nRegion:      {}\nBlock CIDR:  {}\nFile:        {}\n",
        entry.subnet.cidr, entry.subnet.name, entry.subnet.region, entry.block.cidr, entry.file_key
    )
}

/// Table of the patterns of one file key.
pub fn render_patterns(patterns: Option<&Patterns>) -> String {
    let mut table = Table::new(&["Name", "CIDR Size", "Environment", "Region", "Block"]);
    for pattern in patterns.into_iter().flat_map(|p| p.values()) {
        table.add_row(vec![
            pattern.name.clone(),
            format!("/{}", pattern.cidr_size),
            pattern.environment.clone(),
            pattern.region.clone(),
            pattern.block.clone(),
        ]);
    }
    if table.is_empty() {
        return "No patterns found\n".to_string();
    }
    table.render()
}

pub fn render_pattern(pattern: &Pattern) -> String {
    format!("{pattern}\n")
}

/// Free CIDRs of a block.
pub fn render_available(block: &Block, available: &[String]) -> String {
    let mut out = format!("Available CIDRs in block {}:\n", block.cidr);
    if available.is_empty() {
        out.push_str("  none, the block is fully allocated\n");
    }
    for cidr in available {
        out.push_str(&format!("  {cidr}\n"));
    }
    out
}

/// Utilization report of one block, with each subnet's share.
pub fn render_utilization(utilization: &Utilization, shares: &[SubnetShare<'_>]) -> String {
    let mut out = String::from("Block Utilization Report\n----------------------\n");
    out.push_str(&format!("{}{}\n", format_field("CIDR:", STAT_WIDTH), utilization.cidr));
    out.push_str(&render_stats(utilization));

    if !shares.is_empty() {
        out.push_str("\nSubnets:\n");
        let mut table = Table::new(&["CIDR", "Name", "Region", "IP Count", "% of Block"]);
        for share in shares {
            table.add_row(vec![
                share.subnet.cidr.clone(),
                share.subnet.name.clone(),
                share.subnet.region.clone(),
                share.size.to_string(),
                format!("{:.2}%", share.percent),
            ]);
        }
        out.push_str(&table.render());
    }
    out
}

/// One utilization row per block.
pub fn render_utilization_summary(rows: &[Utilization]) -> String {
    if rows.is_empty() {
        return "No blocks found\n".to_string();
    }
    let mut table = Table::new(&["CIDR", "Total IPs", "Allocated IPs", "Available IPs", "Utilization"]);
    for u in rows {
        table.add_row(vec![
            u.cidr.clone(),
            u.total.to_string(),
            u.allocated.to_string(),
            u.available.to_string(),
            format!("{:.2}%", u.percent()),
        ]);
    }
    table.render()
}

fn render_stats(u: &Utilization) -> String {
    let mut out = String::new();
    for (label, value) in [
        ("Total IPs:", u.total.to_string()),
        ("Allocated IPs:", u.allocated.to_string()),
        ("Available IPs:", u.available.to_string()),
        ("Utilization:", format!("{:.2}%", u.percent())),
    ] {
        out.push_str(&format!("{}{value}\n", format_field(label, STAT_WIDTH)));
    }
    out
}

/// Validation results of one file, errors in red and warnings in yellow.
pub fn render_validation(report: &Report) -> String {
    let mut out = format!(
        "Validation Results for: {}\nErrors: {}  Warnings: {}\n\n",
        report.file_key, report.error_count, report.warning_count
    );

    if report.results.is_empty() {
        out.push_str("No issues found. Configuration is valid.\n");
        return out;
    }

    let mut table = Table::new(&["Type", "Category", "Location", "Description"]);
    for r in &report.results {
        table.add_row(vec![
            r.severity.to_string(),
            r.category.to_string(),
            r.location.clone(),
            r.description.clone(),
        ]);
    }
    out.push_str(&table.render_with(|column, raw, cell| match (column, raw) {
        (0, "ERROR") => cell.red().bold().to_string(),
        (0, "WARNING") => cell.yellow().to_string(),
        _ => cell,
    }));
    out
}

/// Validation results of several files followed by the totals.
pub fn render_validation_summary(reports: &[Report]) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("\n=== Block File: {} ===\n", report.file_key));
        out.push_str(&render_validation(report));
    }
    let errors: usize = reports.iter().map(|r| r.error_count).sum();
    let warnings: usize = reports.iter().map(|r| r.warning_count).sum();
    out.push_str(&format!(
        "\nValidation Summary\nTotal Errors: {errors}  Total Warnings: {warnings}\n"
    ));
    out
}

//! Block file validation.
//!
//! Runs every check over a whole block collection and collects the problems
//! found as [`ValidationResult`]s. Validation never stops at the first
//! problem and never fails; callers decide what an error count means.

use super::inventory::resolve_target;
use crate::error::Result;
use crate::models::{
    contains_cidr, overlaps, Block, BlockFiles, Cidr, PatternTable, Patterns, Subnet, Target,
};
use itertools::Itertools;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Which rule produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Structure,
    Cidr,
    Duplicate,
    Containment,
    Overlap,
    Metadata,
    Reference,
}

/// A single problem found in a block file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub severity: Severity,
    pub category: Category,
    /// Where the problem is, e.g. `blocks.10.0.0.0/16.subnets[0]`.
    pub location: String,
    pub description: String,
}

/// All problems found in one block file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    pub file_key: String,
    pub results: Vec<ValidationResult>,
    pub error_count: usize,
    pub warning_count: usize,
}

impl Report {
    pub fn new(file_key: &str) -> Report {
        Report {
            file_key: file_key.to_string(),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Number of results in `category`.
    pub fn count(&self, category: Category) -> usize {
        self.results.iter().filter(|r| r.category == category).count()
    }

    fn push(&mut self, severity: Severity, category: Category, location: String, description: String) {
        match severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
        }
        self.results.push(ValidationResult {
            severity,
            category,
            location,
            description,
        });
    }

    fn error(&mut self, category: Category, location: String, description: String) {
        self.push(Severity::Error, category, location, description);
    }

    fn warning(&mut self, category: Category, location: String, description: String) {
        self.push(Severity::Warning, category, location, description);
    }

    fn extend(&mut self, other: Report) {
        for r in other.results {
            self.push(r.severity, r.category, r.location, r.description);
        }
    }
}

/// Validate the blocks of one file and the patterns that reference them.
pub fn validate(file_key: &str, blocks: &[Block], patterns: Option<&Patterns>) -> Report {
    let mut report = Report::new(file_key);

    validate_blocks(blocks, &mut report);
    for block in blocks {
        validate_subnets(block, &mut report);
    }
    if let Some(patterns) = patterns {
        validate_references(blocks, patterns, &mut report);
    }

    log::debug!(
        "Validated {file_key}: {} errors, {} warnings",
        report.error_count,
        report.warning_count
    );
    report
}

/// Validate a raw block file document.
///
/// Checks the shape of the document first, then converts whatever is
/// usable into blocks and runs [`validate`] on them.
pub fn validate_document(file_key: &str, document: &Value, patterns: Option<&Patterns>) -> Report {
    let mut report = Report::new(file_key);
    let blocks = validate_structure(document, &mut report);
    report.extend(validate(file_key, &blocks, patterns));
    report
}

/// Validate every file selected by `target`, including overlaps between
/// blocks of different files.
pub fn validate_all(files: &BlockFiles, table: &PatternTable, target: &Target) -> Result<Vec<Report>> {
    let keys = resolve_target(files, target)?;
    let mut reports: Vec<Report> = keys
        .iter()
        .map(|key| validate(key, &files[key], table.get(key)))
        .collect();

    let in_scope: BTreeSet<&str> = keys.iter().map(|k| k.as_str()).collect();
    let parsed: Vec<(&str, &Block, Cidr)> = files
        .iter()
        .flat_map(|(key, blocks)| blocks.iter().map(move |b| (key.as_str(), b)))
        .filter_map(|(key, b)| b.network().ok().map(|net| (key, b, net)))
        .collect();

    for ((key_a, a, net_a), (key_b, b, net_b)) in parsed.iter().tuple_combinations() {
        if key_a == key_b || !overlaps(net_a, net_b) {
            continue;
        }
        // report against the later file when both are in scope
        let (key, block, other_key, other) = if in_scope.contains(key_b) {
            (key_b, b, key_a, a)
        } else if in_scope.contains(key_a) {
            (key_a, a, key_b, b)
        } else {
            continue;
        };
        let (category, description) = if a.cidr == b.cidr {
            (
                Category::Duplicate,
                format!("Block {} also exists in file {other_key}", block.cidr),
            )
        } else {
            (
                Category::Overlap,
                format!(
                    "Block {} overlaps with block {} in file {other_key}",
                    block.cidr, other.cidr
                ),
            )
        };
        if let Some(report) = reports.iter_mut().find(|r| r.file_key == **key) {
            report.error(category, format!("blocks.{}", block.cidr), description);
        }
    }

    Ok(reports)
}

/// Validate raw block file documents by file key.
///
/// Like [`validate_all`], with each document's structure checked first.
pub fn validate_all_documents(
    documents: &BTreeMap<String, Value>,
    table: &PatternTable,
    target: &Target,
) -> Result<Vec<Report>> {
    let mut structure = BTreeMap::new();
    let mut files = BlockFiles::new();
    for (key, document) in documents {
        let mut report = Report::new(key);
        files.insert(key.clone(), validate_structure(document, &mut report));
        structure.insert(key.as_str(), report);
    }

    let reports = validate_all(&files, table, target)?;
    Ok(reports
        .into_iter()
        .map(|report| {
            let mut merged = structure
                .remove(report.file_key.as_str())
                .unwrap_or_else(|| Report::new(&report.file_key));
            merged.extend(report);
            merged
        })
        .collect())
}

fn block_location(index: usize, block: &Block) -> String {
    if block.cidr.trim().is_empty() {
        format!("blocks[{index}]")
    } else {
        format!("blocks.{}", block.cidr)
    }
}

fn validate_blocks(blocks: &[Block], report: &mut Report) {
    let mut seen_cidrs = HashSet::new();
    let mut parsed = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        let location = block_location(i, block);

        if block.cidr.trim().is_empty() {
            report.error(
                Category::Structure,
                location,
                "Block is missing required 'cidr' field".to_string(),
            );
            continue;
        }

        if !seen_cidrs.insert(block.cidr.as_str()) {
            report.error(
                Category::Duplicate,
                location.clone(),
                format!("Duplicate block CIDR: {}", block.cidr),
            );
        }

        match block.network() {
            Ok(net) => parsed.push((block, net)),
            Err(e) => report.error(Category::Cidr, location.clone(), format!("Invalid CIDR format: {e}")),
        }

        if block.description.trim().is_empty() {
            report.warning(Category::Metadata, location, "Block has no description".to_string());
        }
    }

    for ((a, net_a), (b, net_b)) in parsed.iter().tuple_combinations() {
        // identical CIDRs are already reported as duplicates
        if a.cidr != b.cidr && overlaps(net_a, net_b) {
            report.error(
                Category::Overlap,
                format!("blocks.{}", b.cidr),
                format!("Block {} overlaps with block {}", b.cidr, a.cidr),
            );
        }
    }
}

fn validate_subnets(block: &Block, report: &mut Report) {
    let block_net = block.network().ok();
    let mut seen_cidrs = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut parsed: Vec<(&Subnet, String, Cidr)> = Vec::new();

    for (i, subnet) in block.subnets.iter().enumerate() {
        let location = format!("blocks.{}.subnets[{i}]", block.cidr);

        if subnet.cidr.trim().is_empty() {
            report.error(
                Category::Structure,
                location.clone(),
                "Subnet is missing required 'cidr' field".to_string(),
            );
        } else {
            if !seen_cidrs.insert(subnet.cidr.as_str()) {
                report.error(
                    Category::Duplicate,
                    location.clone(),
                    format!("Duplicate subnet CIDR: {}", subnet.cidr),
                );
            }

            match subnet.network() {
                Ok(net) => {
                    if let Some(block_net) = &block_net {
                        if !contains_cidr(block_net, &net) {
                            report.error(
                                Category::Containment,
                                location.clone(),
                                format!(
                                    "Subnet {} is not contained within its parent block {}",
                                    subnet.cidr, block.cidr
                                ),
                            );
                        }
                    }
                    parsed.push((subnet, location.clone(), net));
                }
                Err(e) => report.error(
                    Category::Cidr,
                    location.clone(),
                    format!("Invalid subnet CIDR format: {e}"),
                ),
            }
        }

        if !subnet.name.is_empty() && !seen_names.insert(subnet.name.as_str()) {
            report.error(
                Category::Duplicate,
                location.clone(),
                format!("Duplicate subnet name: {}", subnet.name),
            );
        }

        for (field, value) in [("name", &subnet.name), ("region", &subnet.region)] {
            if value.trim().is_empty() {
                report.error(
                    Category::Metadata,
                    location.clone(),
                    format!("Subnet missing required field: {field}"),
                );
            }
        }
    }

    for ((a, _, net_a), (b, location_b, net_b)) in parsed.iter().tuple_combinations() {
        if a.cidr != b.cidr && overlaps(net_a, net_b) {
            report.error(
                Category::Overlap,
                location_b.clone(),
                format!("Subnet {} overlaps with subnet {}", b.cidr, a.cidr),
            );
        }
    }
}

fn validate_references(blocks: &[Block], patterns: &Patterns, report: &mut Report) {
    for (name, pattern) in patterns {
        if !blocks.iter().any(|b| b.has_cidr(&pattern.block)) {
            report.error(
                Category::Reference,
                format!("patterns.{name}"),
                format!("Pattern '{name}' references non-existent block: {}", pattern.block),
            );
        }
    }
}

/// Check the raw document shape and return the blocks that can be used.
fn validate_structure(document: &Value, report: &mut Report) -> Vec<Block> {
    let items = match document {
        Value::Null => return vec![],
        Value::Array(items) => items,
        _ => {
            report.error(
                Category::Structure,
                "root".to_string(),
                "File is not a list of blocks".to_string(),
            );
            return vec![];
        }
    };

    let mut blocks = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let location = format!("blocks[{i}]");
        let Some(map) = item.as_object() else {
            report.error(Category::Structure, location, "Block data is not a map".to_string());
            continue;
        };

        let cidr = match map.get("cidr") {
            Some(Value::String(cidr)) => cidr.clone(),
            Some(_) => {
                report.error(
                    Category::Structure,
                    format!("{location}.cidr"),
                    "Block 'cidr' field is not a string".to_string(),
                );
                continue;
            }
            None => {
                report.error(
                    Category::Structure,
                    location,
                    "Block is missing required 'cidr' field".to_string(),
                );
                continue;
            }
        };

        let mut block = Block::new(&cidr, &string_field(map.get("description"), &location, "description", report));
        match map.get("subnets") {
            None | Some(Value::Null) => {}
            Some(Value::Array(subnets)) => {
                for (j, subnet) in subnets.iter().enumerate() {
                    if let Some(subnet) = subnet_from_value(subnet, &format!("{location}.subnets[{j}]"), report) {
                        block.add_subnet(subnet);
                    }
                }
            }
            Some(_) => report.error(
                Category::Structure,
                format!("{location}.subnets"),
                "Subnets data is not a list".to_string(),
            ),
        }
        blocks.push(block);
    }
    blocks
}

fn subnet_from_value(value: &Value, location: &str, report: &mut Report) -> Option<Subnet> {
    let Some(map) = value.as_object() else {
        report.error(Category::Structure, location.to_string(), "Subnet data is not a map".to_string());
        return None;
    };
    match map.get("cidr") {
        Some(Value::String(cidr)) => Some(Subnet::new(
            cidr,
            &string_field(map.get("name"), location, "name", report),
            &string_field(map.get("region"), location, "region", report),
        )),
        Some(_) => {
            report.error(
                Category::Structure,
                format!("{location}.cidr"),
                "Subnet 'cidr' field is not a string".to_string(),
            );
            None
        }
        None => {
            report.error(
                Category::Structure,
                location.to_string(),
                "Subnet is missing required 'cidr' field".to_string(),
            );
            None
        }
    }
}

/// Optional string field, reporting values of the wrong type.
fn string_field(value: Option<&Value>, location: &str, field: &str, report: &mut Report) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            report.error(
                Category::Structure,
                format!("{location}.{field}"),
                format!("Field '{field}' is not a string"),
            );
            String::new()
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Structure => "structure",
            Category::Cidr => "cidr",
            Category::Duplicate => "duplicate",
            Category::Containment => "containment",
            Category::Overlap => "overlap",
            Category::Metadata => "metadata",
            Category::Reference => "reference",
        };
        write!(f, "{name}")
    }
}

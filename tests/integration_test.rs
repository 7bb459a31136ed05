//! Integration tests for ipam-blocks
//!
//! These tests run the engine end to end: from fixture and temporary block
//! files through allocation, utilization and validation.

use clap::Parser;
use ipam_blocks::cli::{run, Cli};
use ipam_blocks::models::{overlaps, Block, Cidr, Pattern, Patterns, Target};
use ipam_blocks::processing::{
    calculate, create_from_pattern, create_subnet, find_available, find_available_cidrs,
    validate, validate_all_documents, Category,
};
use ipam_blocks::store;
use ipam_blocks::IpamError;
use std::collections::BTreeMap;
use std::path::Path;

const TEST_DATA: &str = "src/tests/test_data";

fn pattern(name: &str, cidr_size: u8, block: &str) -> Patterns {
    let mut patterns = Patterns::new();
    patterns.insert(
        name.to_string(),
        Pattern {
            name: name.to_string(),
            cidr_size,
            environment: "dev".to_string(),
            region: "us-east1".to_string(),
            block: block.to_string(),
        },
    );
    patterns
}

#[test]
fn test_empty_block_is_fully_available() {
    let block = Block::new("10.0.0.0/16", "main");
    assert_eq!(find_available(&block).unwrap(), vec!["10.0.0.0/16"]);
}

#[test]
fn test_gap_after_first_subnet() {
    let block = Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.0/26", "app", "us-east1");
    assert_eq!(
        find_available(&block).unwrap(),
        vec!["10.0.0.64/26", "10.0.0.128/25"]
    );
}

#[test]
fn test_second_identical_subnet_overlaps() {
    let block = Block::new("10.0.0.0/16", "main");
    let block = create_subnet(&block, "10.0.1.0/24", "first", "us-east1").unwrap();
    let err = create_subnet(&block, "10.0.1.0/24", "second", "us-east1").unwrap_err();
    assert!(matches!(err, IpamError::OverlapDetected(..)), "{err}");
}

#[test]
fn test_subnet_outside_block() {
    let block = Block::new("10.0.0.0/16", "main");
    let err = create_subnet(&block, "11.0.0.0/24", "outside", "us-east1").unwrap_err();
    assert!(matches!(err, IpamError::OutOfBlockRange { .. }), "{err}");
}

#[test]
fn test_pattern_on_full_block() {
    let block = Block::new("10.0.0.0/24", "main")
        .with_subnet("10.0.0.0/26", "a", "r")
        .with_subnet("10.0.0.64/26", "b", "r")
        .with_subnet("10.0.0.128/26", "c", "r")
        .with_subnet("10.0.0.192/26", "d", "r");
    let err = create_from_pattern("web", &pattern("web", 26, "10.0.0.0/24"), &[block]).unwrap_err();
    assert_eq!(err, IpamError::NoAvailableSpace("10.0.0.0/24".to_string()));
}

#[test]
fn test_validation_containment_only() {
    let block = Block::new("10.0.0.0/16", "main").with_subnet("192.168.0.0/24", "stray", "us-east1");
    let report = validate("default", &[block], None);
    assert_eq!(report.count(Category::Containment), 1);
    assert_eq!(report.count(Category::Overlap), 0);
    assert_eq!(report.error_count, 1);
}

#[test]
fn test_pattern_allocations_fill_block_exactly() {
    let patterns = pattern("web", 26, "10.0.0.0/24");
    let mut blocks = vec![Block::new("10.0.0.0/24", "main")];
    let mut carved = vec![];
    for _ in 0..4 {
        let allocation = create_from_pattern("web", &patterns, &blocks).unwrap();
        carved.push(allocation.subnet.cidr.clone());
        blocks = allocation.blocks;
    }
    assert_eq!(
        carved,
        vec!["10.0.0.0/26", "10.0.0.64/26", "10.0.0.128/26", "10.0.0.192/26"]
    );
    assert_eq!(calculate(&blocks[0]).unwrap().ratio, 1.0);
    assert!(find_available(&blocks[0]).unwrap().is_empty());
    assert!(validate("default", &blocks, Some(&patterns)).results.is_empty());
}

#[test]
fn test_gaps_partition_block() {
    let block = Block::new("10.10.0.0/20", "main")
        .with_subnet("10.10.0.16/28", "a", "r")
        .with_subnet("10.10.3.0/24", "b", "r")
        .with_subnet("10.10.8.0/22", "c", "r")
        .with_subnet("10.10.15.255/32", "d", "r");
    let gaps = find_available_cidrs(&block).unwrap();

    let subnets: Vec<Cidr> = block.subnets.iter().map(|s| s.network().unwrap()).collect();
    for gap in &gaps {
        assert!(subnets.iter().all(|s| !overlaps(gap, s)), "{gap} overlaps a subnet");
    }

    let free = gaps.iter().map(|g| calculate(&Block::new(&g.to_string(), "")).unwrap().total_u64());
    let used = calculate(&block).unwrap();
    assert_eq!(free.sum::<u64>() + used.allocated_u64(), used.total_u64());
}

#[test]
fn test_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = store::init_config(dir.path(), "default").unwrap();
    let original = store::load_block_files(&config).unwrap();

    let block = create_subnet(&Block::new("10.0.0.0/16", "main"), "10.0.1.0/24", "app", "us-east1").unwrap();
    let mut updated = original.clone();
    updated.insert("default".to_string(), vec![block]);
    store::save_changed(&config, &original, &updated).unwrap();

    let config = store::load_config(dir.path()).unwrap();
    assert_eq!(store::load_block_files(&config).unwrap(), updated);
}

#[test]
fn test_fixture_check_reports_every_problem() {
    let config = store::load_config(Path::new(TEST_DATA)).expect("Failed to load fixture config");
    assert_eq!(config.patterns["default"]["web"].name, "web");
    assert!(
        store::load_block_files(&config).is_err(),
        "A block without cidr cannot be loaded as typed blocks"
    );

    let mut documents = BTreeMap::new();
    for key in config.block_files.keys() {
        let path = config.block_file_path(key).unwrap();
        documents.insert(key.clone(), store::read_document(&path).unwrap());
    }
    let reports = validate_all_documents(&documents, &config.patterns, &Target::All).unwrap();
    assert_eq!(reports.len(), 2);

    let broken = reports.iter().find(|r| r.file_key == "broken").unwrap();
    assert_eq!(broken.count(Category::Structure), 1);
    assert_eq!(broken.count(Category::Cidr), 1);
    assert_eq!(broken.count(Category::Containment), 1);
    assert_eq!(broken.count(Category::Metadata), 2);
    assert!(broken.count(Category::Overlap) >= 2);
    assert!(broken.has_errors());

    let default = reports.iter().find(|r| r.file_key == "default").unwrap();
    assert_eq!(default.count(Category::Reference), 1, "{:?}", default.results);
}

#[test]
fn test_cli_check_exit_status() {
    let cli = Cli::try_parse_from(["ipam-blocks", "--config", TEST_DATA, "check", "blocks", "--all"]).unwrap();
    let outcome = run(&cli).unwrap();
    assert!(!outcome.success);
    assert!(outcome.output.contains("=== Block File: broken ==="));
    assert!(outcome.output.contains("Validation Summary"));
}

#[test]
fn test_pattern_allocation_never_breaks_check() {
    let patterns = pattern("web", 26, "10.0.0.0/24");
    let blocks = vec![Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.128/26", "web-10.0.0.0", "us-east1")];
    assert!(validate("default", &blocks, Some(&patterns)).results.is_empty());

    let err = create_from_pattern("web", &patterns, &blocks).unwrap_err();
    assert!(matches!(err, IpamError::DuplicateEntity { .. }), "{err}");

    let err = create_subnet(&blocks[0], "10.0.0.0/26", "app", "").unwrap_err();
    assert_eq!(err, IpamError::MissingField("region"));
}

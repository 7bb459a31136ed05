//! Operations over every block file managed together.
//!
//! Block creation and deletion, subnet lookups and removal, and pattern
//! management. All functions take the collections they work on and return
//! updated copies; nothing here reads or writes files.

use super::allocator::create_subnet;
use crate::error::{IpamError, Result};
use crate::models::{
    overlaps, Block, BlockFiles, Cidr, Pattern, PatternTable, Subnet, Target,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PATTERN_NAME: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid Regex?");
}

/// Location of a block: its file key and index in that file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub file_key: String,
    pub index: usize,
}

/// A subnet together with the block it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetEntry<'a> {
    pub file_key: &'a str,
    pub block: &'a Block,
    pub subnet: &'a Subnet,
}

/// Resolve `target` into the file keys it selects, in key order.
pub fn resolve_target(files: &BlockFiles, target: &Target) -> Result<Vec<String>> {
    match target {
        Target::All => Ok(files.keys().cloned().collect()),
        Target::Specific(key) if files.contains_key(key) => Ok(vec![key.clone()]),
        Target::Specific(key) => Err(IpamError::FileKeyNotFound(key.clone())),
    }
}

/// Find a block by CIDR among the files selected by `target`.
pub fn find_block(files: &BlockFiles, cidr: &str, target: &Target) -> Result<BlockRef> {
    let cidr = cidr.trim();
    for key in resolve_target(files, target)? {
        if let Some(index) = files[&key].iter().position(|b| b.has_cidr(cidr)) {
            return Ok(BlockRef {
                file_key: key,
                index,
            });
        }
    }
    Err(IpamError::BlockNotFound(cidr.to_string()))
}

/// Add a new block to file `file_key`.
///
/// The block may not overlap a block in any file.
pub fn create_block(
    files: &BlockFiles,
    file_key: &str,
    cidr: &str,
    description: &str,
) -> Result<BlockFiles> {
    log::debug!("Creating block {cidr} in file {file_key}");
    if !files.contains_key(file_key) {
        return Err(IpamError::FileKeyNotFound(file_key.to_string()));
    }
    let new_net = Cidr::new(cidr)?.canonical();
    let new_cidr = new_net.to_string();

    for (key, blocks) in files {
        for block in blocks {
            let existing = match block.network() {
                Ok(net) => net.canonical(),
                Err(e) => {
                    log::warn!("Ignoring unparseable block in file {key}: {e}");
                    continue;
                }
            };
            if existing == new_net {
                return Err(IpamError::duplicate("Block", &new_cidr));
            }
            if overlaps(&new_net, &existing) {
                log::warn!("CIDR overlap detected between {new_cidr} and {} in file {key}", block.cidr);
                return Err(IpamError::OverlapDetected(new_cidr, block.cidr.clone()));
            }
        }
    }

    let mut updated = files.clone();
    if let Some(blocks) = updated.get_mut(file_key) {
        blocks.push(Block::new(&new_cidr, description));
    }
    log::info!("Block {new_cidr} created in file {file_key}");
    Ok(updated)
}

/// Remove the first block with CIDR `cidr` among the files selected by `target`.
pub fn delete_block(files: &BlockFiles, cidr: &str, target: &Target) -> Result<BlockFiles> {
    let found = find_block(files, cidr, target)?;
    let mut updated = files.clone();
    if let Some(blocks) = updated.get_mut(&found.file_key) {
        let removed = blocks.remove(found.index);
        log::info!(
            "Block {} deleted from file {} ({} subnets dropped)",
            removed.cidr,
            found.file_key,
            removed.subnets.len()
        );
    }
    Ok(updated)
}

/// Add a subnet to the block with CIDR `block_cidr`, in whichever file holds it.
pub fn create_subnet_in(
    files: &BlockFiles,
    block_cidr: &str,
    subnet_cidr: &str,
    name: &str,
    region: &str,
) -> Result<BlockFiles> {
    let found = find_block(files, block_cidr, &Target::All)?;
    let block = &files[&found.file_key][found.index];
    let new_block = create_subnet(block, subnet_cidr, name, region)?;

    let mut updated = files.clone();
    if let Some(blocks) = updated.get_mut(&found.file_key) {
        blocks[found.index] = new_block;
    }
    Ok(updated)
}

/// Remove the subnet with CIDR `subnet_cidr` from whichever block holds it.
pub fn delete_subnet(files: &BlockFiles, subnet_cidr: &str) -> Result<BlockFiles> {
    Cidr::new(subnet_cidr)?;
    let subnet_cidr = subnet_cidr.trim();

    let found = files.iter().find_map(|(key, blocks)| {
        blocks.iter().enumerate().find_map(|(i, block)| {
            let pos = block.subnets.iter().position(|s| s.cidr == subnet_cidr)?;
            Some((key.clone(), i, pos))
        })
    });
    let Some((key, index, pos)) = found else {
        return Err(IpamError::SubnetNotFound(subnet_cidr.to_string()));
    };

    let mut updated = files.clone();
    if let Some(block) = updated.get_mut(&key).and_then(|blocks| blocks.get_mut(index)) {
        block.subnets.remove(pos);
        log::info!("Subnet {subnet_cidr} deleted from block {} in file {key}", block.cidr);
    }
    Ok(updated)
}

/// Find a subnet by CIDR in any file.
pub fn find_subnet<'a>(files: &'a BlockFiles, subnet_cidr: &str) -> Result<SubnetEntry<'a>> {
    let subnet_cidr = subnet_cidr.trim();
    all_subnets(files)
        .find(|entry| entry.subnet.cidr == subnet_cidr)
        .ok_or_else(|| IpamError::SubnetNotFound(subnet_cidr.to_string()))
}

/// Subnets of every file, optionally filtered by block CIDR and region.
pub fn list_subnets<'a>(
    files: &'a BlockFiles,
    block_cidr: Option<&str>,
    region: Option<&str>,
) -> Vec<SubnetEntry<'a>> {
    all_subnets(files)
        .filter(|entry| block_cidr.map_or(true, |c| entry.block.cidr == c))
        .filter(|entry| region.map_or(true, |r| entry.subnet.region == r))
        .collect()
}

fn all_subnets(files: &BlockFiles) -> impl Iterator<Item = SubnetEntry<'_>> {
    files.iter().flat_map(|(key, blocks)| {
        blocks.iter().flat_map(move |block| {
            block.subnets.iter().map(move |subnet| SubnetEntry {
                file_key: key.as_str(),
                block,
                subnet,
            })
        })
    })
}

/// Register a new pattern for file `file_key`.
#[allow(clippy::too_many_arguments)]
pub fn create_pattern(
    table: &PatternTable,
    files: &BlockFiles,
    file_key: &str,
    name: &str,
    cidr_size: u8,
    environment: &str,
    region: &str,
    block_cidr: &str,
) -> Result<PatternTable> {
    log::debug!("Creating pattern {name} for file {file_key}");
    if !PATTERN_NAME.is_match(name) {
        return Err(IpamError::InvalidPatternName(name.to_string()));
    }
    if table.get(file_key).is_some_and(|p| p.contains_key(name)) {
        return Err(IpamError::duplicate("Pattern", name));
    }
    if region.trim().is_empty() {
        return Err(IpamError::MissingField("region"));
    }
    let block_cidr = block_cidr.trim();

    let blocks = files
        .get(file_key)
        .ok_or_else(|| IpamError::FileKeyNotFound(file_key.to_string()))?;
    let block = blocks
        .iter()
        .find(|b| b.has_cidr(block_cidr))
        .ok_or_else(|| IpamError::BlockNotFound(block_cidr.to_string()))?;

    let width = block.network()?.width();
    if cidr_size > width {
        return Err(IpamError::InvalidPrefixLength {
            prefix: cidr_size,
            max: width,
        });
    }

    let pattern = Pattern {
        name: name.to_string(),
        cidr_size,
        environment: environment.to_string(),
        region: region.to_string(),
        block: block_cidr.to_string(),
    };
    log::debug!("Pattern created: {pattern}");

    let mut updated = table.clone();
    updated
        .entry(file_key.to_string())
        .or_default()
        .insert(name.to_string(), pattern);
    Ok(updated)
}

/// Look up a pattern by name.
pub fn get_pattern<'a>(table: &'a PatternTable, file_key: &str, name: &str) -> Result<&'a Pattern> {
    table
        .get(file_key)
        .and_then(|patterns| patterns.get(name))
        .ok_or_else(|| IpamError::PatternNotFound(name.to_string()))
}

/// Remove a pattern.
pub fn delete_pattern(table: &PatternTable, file_key: &str, name: &str) -> Result<PatternTable> {
    get_pattern(table, file_key, name)?;
    let mut updated = table.clone();
    if let Some(patterns) = updated.get_mut(file_key) {
        patterns.remove(name);
    }
    log::debug!("Pattern deleted: {name}");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> BlockFiles {
        let mut files = BlockFiles::new();
        files.insert(
            "default".to_string(),
            vec![Block::new("10.0.0.0/16", "main").with_subnet("10.0.1.0/24", "app", "us-east1")],
        );
        files.insert(
            "lab".to_string(),
            vec![Block::new("172.16.0.0/16", "lab").with_subnet("172.16.0.0/24", "bench", "eu-west1")],
        );
        files
    }

    #[test]
    fn test_resolve_target() {
        let files = files();
        assert_eq!(resolve_target(&files, &Target::All).unwrap(), vec!["default", "lab"]);
        assert_eq!(
            resolve_target(&files, &Target::Specific("lab".into())).unwrap(),
            vec!["lab"]
        );
        assert_eq!(
            resolve_target(&files, &Target::Specific("nope".into())).unwrap_err(),
            IpamError::FileKeyNotFound("nope".into())
        );
    }

    #[test]
    fn test_create_block() {
        let updated = create_block(&files(), "lab", "192.168.0.5/24", "new").unwrap();
        assert_eq!(updated["lab"].len(), 2);
        assert_eq!(updated["lab"][1].cidr, "192.168.0.0/24");
    }

    #[test]
    fn test_create_block_overlaps_other_file() {
        let err = create_block(&files(), "lab", "10.0.128.0/17", "clash").unwrap_err();
        assert_eq!(
            err,
            IpamError::OverlapDetected("10.0.128.0/17".into(), "10.0.0.0/16".into())
        );
        let err = create_block(&files(), "lab", "10.0.0.0/16", "same").unwrap_err();
        assert!(matches!(err, IpamError::DuplicateEntity { .. }));
        let err = create_block(&files(), "missing", "11.0.0.0/16", "x").unwrap_err();
        assert_eq!(err, IpamError::FileKeyNotFound("missing".into()));
        assert!(create_block(&files(), "lab", "11.0.0.0/99", "x").is_err());
    }

    #[test]
    fn test_create_block_same_network_is_duplicate() {
        let mut files = files();
        files.insert("legacy".to_string(), vec![Block::new("10.1.0.5/16", "hand edited")]);
        assert_eq!(
            create_block(&files, "lab", "10.1.0.0/16", "again").unwrap_err(),
            IpamError::duplicate("Block", "10.1.0.0/16")
        );
        assert_eq!(
            create_block(&files, "lab", "10.1.255.255/16", "again").unwrap_err(),
            IpamError::duplicate("Block", "10.1.0.0/16")
        );
    }

    #[test]
    fn test_delete_block() {
        let updated = delete_block(&files(), "172.16.0.0/16", &Target::All).unwrap();
        assert!(updated["lab"].is_empty());
        assert_eq!(updated["default"].len(), 1);

        let err = delete_block(&files(), "172.16.0.0/16", &Target::Specific("default".into()));
        assert_eq!(err.unwrap_err(), IpamError::BlockNotFound("172.16.0.0/16".into()));
    }

    #[test]
    fn test_create_and_delete_subnet() {
        let updated = create_subnet_in(&files(), "172.16.0.0/16", "172.16.1.0/24", "web", "eu-west1").unwrap();
        assert_eq!(updated["lab"][0].subnets.len(), 2);

        let updated = delete_subnet(&updated, "172.16.0.0/24").unwrap();
        assert_eq!(updated["lab"][0].subnets[0].name, "web");

        assert_eq!(
            delete_subnet(&updated, "172.16.0.0/24").unwrap_err(),
            IpamError::SubnetNotFound("172.16.0.0/24".into())
        );
        assert!(matches!(
            delete_subnet(&updated, "nope").unwrap_err(),
            IpamError::InvalidCidr { .. }
        ));
        assert_eq!(
            create_subnet_in(&files(), "9.0.0.0/8", "9.0.0.0/24", "x", "r").unwrap_err(),
            IpamError::BlockNotFound("9.0.0.0/8".into())
        );
    }

    #[test]
    fn test_find_and_list_subnets() {
        let files = files();
        let entry = find_subnet(&files, "172.16.0.0/24").unwrap();
        assert_eq!(entry.file_key, "lab");
        assert_eq!(entry.block.cidr, "172.16.0.0/16");
        assert!(find_subnet(&files, "1.1.1.0/24").is_err());

        assert_eq!(list_subnets(&files, None, None).len(), 2);
        assert_eq!(list_subnets(&files, Some("10.0.0.0/16"), None).len(), 1);
        assert_eq!(list_subnets(&files, None, Some("eu-west1"))[0].subnet.name, "bench");
        assert!(list_subnets(&files, Some("10.0.0.0/16"), Some("eu-west1")).is_empty());
    }

    #[test]
    fn test_pattern_lifecycle() {
        let files = files();
        let table = PatternTable::new();
        let table = create_pattern(&table, &files, "default", "web", 26, "dev", "us-east1", "10.0.0.0/16").unwrap();
        assert_eq!(get_pattern(&table, "default", "web").unwrap().cidr_size, 26);

        assert_eq!(
            create_pattern(&table, &files, "default", "web", 26, "dev", "r", "10.0.0.0/16").unwrap_err(),
            IpamError::duplicate("Pattern", "web")
        );
        assert_eq!(
            create_pattern(&table, &files, "default", "db", 33, "dev", "r", "10.0.0.0/16").unwrap_err(),
            IpamError::InvalidPrefixLength { prefix: 33, max: 32 }
        );
        assert_eq!(
            create_pattern(&table, &files, "default", "db", 24, "dev", "r", "172.16.0.0/16").unwrap_err(),
            IpamError::BlockNotFound("172.16.0.0/16".into())
        );
        assert_eq!(
            create_pattern(&table, &files, "nope", "db", 24, "dev", "r", "10.0.0.0/16").unwrap_err(),
            IpamError::FileKeyNotFound("nope".into())
        );
        assert_eq!(
            create_pattern(&table, &files, "default", "bad name", 24, "dev", "r", "10.0.0.0/16").unwrap_err(),
            IpamError::InvalidPatternName("bad name".into())
        );

        assert_eq!(
            create_pattern(&table, &files, "default", "db", 24, "dev", " ", "10.0.0.0/16").unwrap_err(),
            IpamError::MissingField("region")
        );

        let table = create_pattern(&table, &files, "default", "db", 24, "dev", "r", " 10.0.0.0/16 ").unwrap();
        assert_eq!(get_pattern(&table, "default", "db").unwrap().block, "10.0.0.0/16");

        let table = delete_pattern(&table, "default", "web").unwrap();
        assert!(get_pattern(&table, "default", "web").is_err());
        assert!(delete_pattern(&table, "default", "web").is_err());
    }
}

//! Subnet allocation.
//!
//! Manual insertion of a caller-chosen subnet, and first-fit carving of a
//! subnet from the free space of a block as described by a [`Pattern`].

use super::gap_finder::find_available_cidrs;
use crate::error::{IpamError, Result};
use crate::models::{contains, contains_cidr, overlaps, Block, Cidr, Patterns, Subnet};

/// Result of a pattern allocation.
#[derive(Debug, Clone)]
pub struct Allocation {
    /// The block collection with the new subnet appended.
    pub blocks: Vec<Block>,
    /// The subnet that was carved.
    pub subnet: Subnet,
}

/// Returns the first subnet of `block` that overlaps `candidate`, if any.
///
/// Subnets with unparseable CIDRs are ignored.
pub fn find_overlapping<'a>(block: &'a Block, candidate: &Cidr) -> Option<&'a Subnet> {
    block.subnets.iter().find(|existing| {
        existing
            .network()
            .map(|net| overlaps(&net, candidate))
            .unwrap_or(false)
    })
}

/// Add a subnet to `block`, returning the updated block.
///
/// Preconditions are checked in order and the first violation is returned:
/// the CIDR parses, it lies inside the block, the block still has free
/// space, it overlaps no existing subnet, its name is present and unused, and
/// it has a region.
pub fn create_subnet(block: &Block, subnet_cidr: &str, name: &str, region: &str) -> Result<Block> {
    log::debug!(
        "Creating subnet: block={}, subnet={subnet_cidr}, name={name}, region={region}",
        block.cidr
    );

    let subnet_net = Cidr::new(subnet_cidr)?;
    let block_net = block.network()?;

    if !contains(&block_net, subnet_net.network()) || !contains_cidr(&block_net, &subnet_net) {
        return Err(IpamError::OutOfBlockRange {
            subnet: subnet_cidr.to_string(),
            block: block.cidr.clone(),
        });
    }

    if find_available_cidrs(block)?.is_empty() {
        return Err(IpamError::NoAvailableSpace(block.cidr.clone()));
    }

    if let Some(existing) = find_overlapping(block, &subnet_net) {
        return Err(IpamError::OverlapDetected(
            subnet_cidr.to_string(),
            existing.cidr.clone(),
        ));
    }

    if name.trim().is_empty() {
        return Err(IpamError::MissingField("name"));
    }
    if block.subnets.iter().any(|s| s.name == name) {
        return Err(IpamError::duplicate("Subnet name", name));
    }
    if region.trim().is_empty() {
        return Err(IpamError::MissingField("region"));
    }

    let mut updated = block.clone();
    updated.add_subnet(Subnet::new(
        &subnet_net.canonical().to_string(),
        name,
        region,
    ));
    log::info!("Subnet {} created in block {}", subnet_net.canonical(), block.cidr);
    Ok(updated)
}

/// Carve a subnet from the block referenced by pattern `pattern_name`.
///
/// The first free range (in address order) big enough for a subnet of the
/// pattern's `cidr_size` is used, and the subnet starts at its base address.
/// The subnet is named `<pattern>-<base address>` and takes the pattern's
/// region; a name already used in the block is rejected.
pub fn create_from_pattern(
    pattern_name: &str,
    patterns: &Patterns,
    blocks: &[Block],
) -> Result<Allocation> {
    log::debug!("Creating subnet from pattern {pattern_name}");

    let pattern = patterns
        .get(pattern_name)
        .ok_or_else(|| IpamError::PatternNotFound(pattern_name.to_string()))?;

    if pattern.region.trim().is_empty() {
        return Err(IpamError::MissingField("region"));
    }

    let block_index = blocks
        .iter()
        .position(|b| b.has_cidr(&pattern.block))
        .ok_or_else(|| IpamError::BlockNotFound(pattern.block.trim().to_string()))?;
    let block = &blocks[block_index];
    let block_net = block.network()?;

    if pattern.cidr_size > block_net.width() {
        return Err(IpamError::InvalidPrefixLength {
            prefix: pattern.cidr_size,
            max: block_net.width(),
        });
    }

    let available = find_available_cidrs(block)?;
    if available.is_empty() {
        return Err(IpamError::NoAvailableSpace(block.cidr.clone()));
    }

    let free = available
        .iter()
        .find(|free| free.prefix <= pattern.cidr_size)
        .ok_or_else(|| IpamError::NoSuitableFreeBlock {
            block: block.cidr.clone(),
            prefix: pattern.cidr_size,
        })?;

    let carved = Cidr::from_parts(free.network(), pattern.cidr_size)?;
    debug_assert!(contains_cidr(free, &carved), "carved subnet must fit its free range");

    let name = format!("{pattern_name}-{}", carved.network());
    if block.subnets.iter().any(|s| s.name == name) {
        return Err(IpamError::duplicate("Subnet name", &name));
    }
    let subnet = Subnet::new(&carved.to_string(), &name, &pattern.region);

    let mut updated = blocks.to_vec();
    updated[block_index].add_subnet(subnet.clone());
    log::info!(
        "Subnet {} created from pattern {pattern_name} in block {} (free range {free})",
        subnet.cidr,
        block.cidr
    );

    Ok(Allocation {
        blocks: updated,
        subnet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pattern;

    fn pattern(name: &str, size: u8, block: &str) -> Pattern {
        Pattern {
            name: name.to_string(),
            cidr_size: size,
            environment: "dev".to_string(),
            region: "us-east1".to_string(),
            block: block.to_string(),
        }
    }

    fn patterns(list: &[Pattern]) -> Patterns {
        list.iter().map(|p| (p.name.clone(), p.clone())).collect()
    }

    #[test]
    fn test_create_subnet() {
        let block = Block::new("10.0.0.0/16", "main");
        let updated = create_subnet(&block, "10.0.1.0/24", "app", "us-east1").unwrap();
        assert_eq!(updated.subnets, vec![Subnet::new("10.0.1.0/24", "app", "us-east1")]);
        // input untouched
        assert!(block.subnets.is_empty());
    }

    #[test]
    fn test_create_subnet_twice_overlaps() {
        let block = Block::new("10.0.0.0/16", "main");
        let block = create_subnet(&block, "10.0.1.0/24", "app", "r1").unwrap();
        let err = create_subnet(&block, "10.0.1.0/24", "app2", "r1").unwrap_err();
        assert!(matches!(err, IpamError::OverlapDetected(_, _)), "{err}");
    }

    #[test]
    fn test_create_subnet_partial_overlap() {
        let block = Block::new("10.0.0.0/16", "main").with_subnet("10.0.1.128/25", "a", "r1");
        let err = create_subnet(&block, "10.0.0.0/23", "b", "r1").unwrap_err();
        assert_eq!(
            err,
            IpamError::OverlapDetected("10.0.0.0/23".into(), "10.0.1.128/25".into())
        );
    }

    #[test]
    fn test_create_subnet_out_of_range() {
        let block = Block::new("10.0.0.0/16", "main");
        let err = create_subnet(&block, "11.0.0.0/24", "x", "r1").unwrap_err();
        assert!(matches!(err, IpamError::OutOfBlockRange { .. }), "{err}");
        // base inside but range spills past the block
        let err = create_subnet(&block, "10.0.0.0/8", "x", "r1").unwrap_err();
        assert!(matches!(err, IpamError::OutOfBlockRange { .. }), "{err}");
    }

    #[test]
    fn test_create_subnet_invalid_cidr() {
        let block = Block::new("10.0.0.0/16", "main");
        let err = create_subnet(&block, "10.0.0.0/40", "x", "r1").unwrap_err();
        assert!(matches!(err, IpamError::InvalidCidr { .. }), "{err}");
    }

    #[test]
    fn test_create_subnet_full_block() {
        let block = Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.0/24", "all", "r1");
        let err = create_subnet(&block, "10.0.0.0/26", "x", "r1").unwrap_err();
        assert_eq!(err, IpamError::NoAvailableSpace("10.0.0.0/24".into()));
    }

    #[test]
    fn test_create_subnet_name_rules() {
        let block = Block::new("10.0.0.0/16", "main").with_subnet("10.0.1.0/24", "app", "r1");
        assert_eq!(
            create_subnet(&block, "10.0.2.0/24", "app", "r1").unwrap_err(),
            IpamError::duplicate("Subnet name", "app")
        );
        assert_eq!(
            create_subnet(&block, "10.0.2.0/24", " ", "r1").unwrap_err(),
            IpamError::MissingField("name")
        );
    }

    #[test]
    fn test_create_subnet_requires_region() {
        let block = Block::new("10.0.0.0/16", "main");
        assert_eq!(
            create_subnet(&block, "10.0.2.0/24", "app", "").unwrap_err(),
            IpamError::MissingField("region")
        );
        assert_eq!(
            create_subnet(&block, "10.0.2.0/24", "app", "  ").unwrap_err(),
            IpamError::MissingField("region")
        );
        // name is checked first
        assert_eq!(
            create_subnet(&block, "10.0.2.0/24", "", "").unwrap_err(),
            IpamError::MissingField("name")
        );
    }

    #[test]
    fn test_create_subnet_canonicalizes() {
        let block = Block::new("10.0.0.0/16", "main");
        let updated = create_subnet(&block, "10.0.1.7/24", "app", "r1").unwrap();
        assert_eq!(updated.subnets[0].cidr, "10.0.1.0/24");
    }

    #[test]
    fn test_create_from_pattern_first_fit() {
        let blocks = vec![Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.0/26", "a", "r1")];
        let table = patterns(&[pattern("web", 27, "10.0.0.0/24")]);

        let allocation = create_from_pattern("web", &table, &blocks).unwrap();
        assert_eq!(allocation.subnet.cidr, "10.0.0.64/27");
        assert_eq!(allocation.subnet.name, "web-10.0.0.64");
        assert_eq!(allocation.subnet.region, "us-east1");
        assert_eq!(allocation.blocks[0].subnets.len(), 2);

        let second = create_from_pattern("web", &table, &allocation.blocks).unwrap();
        assert_eq!(second.subnet.cidr, "10.0.0.96/27");
        assert_eq!(second.subnet.name, "web-10.0.0.96");
    }

    #[test]
    fn test_create_from_pattern_skips_small_gaps() {
        // free: 10.0.0.64/26 and 10.0.0.128/25, a /25 only fits the second
        let blocks = vec![Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.0/26", "a", "r1")];
        let table = patterns(&[pattern("big", 25, "10.0.0.0/24")]);
        let allocation = create_from_pattern("big", &table, &blocks).unwrap();
        assert_eq!(allocation.subnet.cidr, "10.0.0.128/25");
        let carved = Cidr::new(&allocation.subnet.cidr).unwrap();
        let free = Cidr::new("10.0.0.128/25").unwrap();
        assert!(contains_cidr(&free, &carved));
    }

    #[test]
    fn test_create_from_pattern_no_space() {
        let blocks = vec![Block::new("10.0.0.0/24", "main")
            .with_subnet("10.0.0.0/26", "a", "r1")
            .with_subnet("10.0.0.64/26", "b", "r1")
            .with_subnet("10.0.0.128/26", "c", "r1")
            .with_subnet("10.0.0.192/26", "d", "r1")];
        let table = patterns(&[pattern("web", 26, "10.0.0.0/24")]);
        assert_eq!(
            create_from_pattern("web", &table, &blocks).unwrap_err(),
            IpamError::NoAvailableSpace("10.0.0.0/24".into())
        );
    }

    #[test]
    fn test_create_from_pattern_no_suitable_block() {
        let blocks = vec![Block::new("10.0.0.0/24", "main")
            .with_subnet("10.0.0.0/26", "a", "r1")
            .with_subnet("10.0.0.128/26", "c", "r1")];
        let table = patterns(&[
            pattern("big", 25, "10.0.0.0/24"),
            pattern("huge", 16, "10.0.0.0/24"),
        ]);
        assert_eq!(
            create_from_pattern("big", &table, &blocks).unwrap_err(),
            IpamError::NoSuitableFreeBlock {
                block: "10.0.0.0/24".into(),
                prefix: 25
            }
        );
        assert!(matches!(
            create_from_pattern("huge", &table, &blocks).unwrap_err(),
            IpamError::NoSuitableFreeBlock { .. }
        ));
    }

    #[test]
    fn test_create_from_pattern_lookup_errors() {
        let blocks = vec![Block::new("10.0.0.0/24", "main")];
        let table = patterns(&[pattern("orphan", 26, "10.9.0.0/16"), pattern("wide", 33, "10.0.0.0/24")]);
        assert_eq!(
            create_from_pattern("missing", &table, &blocks).unwrap_err(),
            IpamError::PatternNotFound("missing".into())
        );
        assert_eq!(
            create_from_pattern("orphan", &table, &blocks).unwrap_err(),
            IpamError::BlockNotFound("10.9.0.0/16".into())
        );
        assert_eq!(
            create_from_pattern("wide", &table, &blocks).unwrap_err(),
            IpamError::InvalidPrefixLength { prefix: 33, max: 32 }
        );
    }

    #[test]
    fn test_create_from_pattern_name_taken() {
        // the first free /26 is 10.0.0.0/26, whose derived name is already in use
        let blocks = vec![Block::new("10.0.0.0/24", "main").with_subnet("10.0.0.128/26", "web-10.0.0.0", "r1")];
        let table = patterns(&[pattern("web", 26, "10.0.0.0/24")]);
        assert_eq!(
            create_from_pattern("web", &table, &blocks).unwrap_err(),
            IpamError::duplicate("Subnet name", "web-10.0.0.0")
        );
    }

    #[test]
    fn test_create_from_pattern_requires_region() {
        let blocks = vec![Block::new("10.0.0.0/24", "main")];
        let mut nowhere = pattern("web", 26, "10.0.0.0/24");
        nowhere.region = String::new();
        assert_eq!(
            create_from_pattern("web", &patterns(&[nowhere]), &blocks).unwrap_err(),
            IpamError::MissingField("region")
        );
    }

    #[test]
    fn test_create_from_pattern_block_reference_trimmed() {
        let blocks = vec![Block::new("10.0.0.0/24", "main")];
        let table = patterns(&[pattern("web", 26, " 10.0.0.0/24 ")]);
        let allocation = create_from_pattern("web", &table, &blocks).unwrap();
        assert_eq!(allocation.subnet.cidr, "10.0.0.0/26");
    }

    #[test]
    fn test_create_from_pattern_ipv6() {
        let blocks = vec![Block::new("fd00::/48", "v6")];
        let table = patterns(&[pattern("v6net", 64, "fd00::/48")]);
        let allocation = create_from_pattern("v6net", &table, &blocks).unwrap();
        assert_eq!(allocation.subnet.cidr, "fd00::/64");
        let next = create_from_pattern("v6net", &table, &allocation.blocks).unwrap();
        assert_eq!(next.subnet.cidr, "fd00:0:0:1::/64");
    }
}

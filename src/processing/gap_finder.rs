//! Gap finding between subnets.
//!
//! Identifies unused address ranges inside a block and splits them into the
//! largest aligned CIDR blocks that fit.

use crate::error::Result;
use crate::models::{
    alignment_prefix, compare_address, family_bits, from_bits, host_mask, next_address, to_bits,
    Block, Cidr, Subnet,
};
use std::net::IpAddr;

/// A row of a block layout, either an allocated subnet or a free range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRow<'a> {
    Subnet(&'a Subnet),
    Gap(Cidr),
}

/// Free space of `block` as maximal aligned CIDR strings, in address order.
pub fn find_available(block: &Block) -> Result<Vec<String>> {
    Ok(find_available_cidrs(block)?
        .iter()
        .map(|c| c.to_string())
        .collect())
}

/// Free space of `block` as maximal aligned CIDRs, in address order.
///
/// Subnets that fail to parse or belong to another address family are
/// skipped with a warning; the validator reports them.
pub fn find_available_cidrs(block: &Block) -> Result<Vec<Cidr>> {
    let block_net = block.network()?;
    let width = block_net.width();
    let block_hi = block_net.hi_bits();

    let subnets = sorted_subnets(block, width);

    let mut available = Vec::new();
    // None once the cursor has run off the end of the address space.
    let mut cursor = Some(block_net.lo_bits());

    for (_, subnet_net) in &subnets {
        let Some(start) = cursor else { break };
        let (lo, hi) = (subnet_net.lo_bits(), subnet_net.hi_bits());

        if start < lo && start <= block_hi {
            let gap_last = (lo - 1).min(block_hi);
            available.extend(split_range(start, gap_last, block_net.prefix, width));
        }

        if hi >= start {
            cursor = next_address(subnet_net.last(), subnet_net.prefix).map(to_bits);
        }
    }

    if let Some(start) = cursor {
        if start <= block_hi {
            available.extend(split_range(start, block_hi, block_net.prefix, width));
        }
    }

    log::debug!(
        "Available CIDRs in block {}: {}",
        block.cidr,
        itertools::join(&available, ", ")
    );
    Ok(available)
}

/// Subnets and free ranges of `block` interleaved in address order.
pub fn block_layout(block: &Block) -> Result<Vec<LayoutRow<'_>>> {
    let block_net = block.network()?;
    let mut rows: Vec<(Cidr, LayoutRow)> = sorted_subnets(block, block_net.width())
        .into_iter()
        .map(|(s, net)| (net, LayoutRow::Subnet(s)))
        .collect();
    rows.extend(
        find_available_cidrs(block)?
            .into_iter()
            .map(|gap| (gap, LayoutRow::Gap(gap))),
    );
    rows.sort_by(|(a, _), (b, _)| compare_address(a.network(), b.network()));
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

/// Split the closed range `[start, last]` into maximal aligned CIDRs no
/// larger than `min_prefix`.
///
/// Returns nothing when the addresses are of different families or
/// `start > last`.
pub fn range_to_cidrs(start: IpAddr, last: IpAddr, min_prefix: u8) -> Vec<Cidr> {
    let width = family_bits(start);
    if width != family_bits(last) || to_bits(start) > to_bits(last) {
        return vec![];
    }
    split_range(to_bits(start), to_bits(last), min_prefix.min(width), width)
}

fn sorted_subnets(block: &Block, width: u8) -> Vec<(&Subnet, Cidr)> {
    let mut subnets: Vec<(&Subnet, Cidr)> = block
        .subnets
        .iter()
        .filter_map(|s| match s.network() {
            Ok(net) if net.width() == width => Some((s, net)),
            Ok(net) => {
                log::warn!(
                    "Skipping subnet {net} of a different address family in block {}",
                    block.cidr
                );
                None
            }
            Err(e) => {
                log::warn!("Skipping subnet in block {}: {e}", block.cidr);
                None
            }
        })
        .collect();
    subnets.sort_by(|(_, a), (_, b)| compare_address(a.network(), b.network()));
    subnets
}

fn split_range(mut start: u128, last: u128, min_prefix: u8, width: u8) -> Vec<Cidr> {
    let mut cidrs = Vec::new();
    loop {
        let prefix = find_biggest_prefix(start, last, min_prefix, width);
        cidrs.push(Cidr {
            addr: from_bits(start, width),
            prefix,
        });
        let block_last = start | host_mask(prefix, width);
        if block_last >= last {
            break;
        }
        start = block_last + 1;
    }
    cidrs
}

/// Find the biggest block that starts at `start` and ends at or before `last`.
///
/// The returned prefix is constrained by:
/// 1. `min_prefix` (never a bigger block than the parent)
/// 2. the alignment of `start`, which must be the block's network address
/// 3. the block must not reach past `last`
fn find_biggest_prefix(start: u128, last: u128, min_prefix: u8, width: u8) -> u8 {
    debug_assert!(start <= last, "start past last should never happen");

    let mut prefix = min_prefix.max(alignment_prefix(start, width));
    while start | host_mask(prefix, width) > last {
        prefix += 1;
    }

    debug_assert!(prefix <= width, "prefix[{prefix}] > {width} should never happen");
    prefix
}

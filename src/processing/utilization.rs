//! Block utilization accounting.
//!
//! Sizes are raw address-space sizes: no network or broadcast addresses are
//! reserved, so the sum over subnets never exceeds the block total for a
//! block without overlapping subnets.

use crate::error::Result;
use crate::models::{saturating_u64, Block, Subnet};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// Utilization statistics for a single block.
#[derive(Debug, Clone, PartialEq)]
pub struct Utilization {
    pub cidr: String,
    pub total: BigUint,
    pub allocated: BigUint,
    pub available: BigUint,
    /// Fraction of the block allocated, 0.0 to 1.0.
    pub ratio: f64,
}

impl Utilization {
    pub fn total_u64(&self) -> u64 {
        saturating_u64(&self.total)
    }

    pub fn allocated_u64(&self) -> u64 {
        saturating_u64(&self.allocated)
    }

    pub fn available_u64(&self) -> u64 {
        saturating_u64(&self.available)
    }

    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

/// A subnet's share of its parent block.
#[derive(Debug, Clone, PartialEq)]
pub struct SubnetShare<'a> {
    pub subnet: &'a Subnet,
    pub size: BigUint,
    /// Percentage of the block, 0.0 to 100.0.
    pub percent: f64,
}

/// Calculate total, allocated and available address counts for `block`.
///
/// Subnets with unparseable CIDRs are not counted.
pub fn calculate(block: &Block) -> Result<Utilization> {
    let total = block.network()?.size();

    let allocated: BigUint = block
        .subnets
        .iter()
        .filter_map(|s| s.network().ok())
        .map(|net| net.size())
        .sum();

    let available = if allocated > total {
        log::warn!(
            "Block {} has more addresses allocated than it holds, check for overlapping subnets",
            block.cidr
        );
        BigUint::zero()
    } else {
        &total - &allocated
    };

    let used = ratio(&allocated, &total);
    log::debug!(
        "Utilization of {}: {allocated}/{total} ({:.2}%)",
        block.cidr,
        used * 100.0
    );

    Ok(Utilization {
        cidr: block.cidr.clone(),
        total,
        allocated,
        available,
        ratio: used,
    })
}

/// Size and percentage of each parseable subnet relative to `block`.
pub fn subnet_shares(block: &Block) -> Result<Vec<SubnetShare<'_>>> {
    let total = block.network()?.size();
    Ok(block
        .subnets
        .iter()
        .filter_map(|subnet| {
            let size = subnet.network().ok()?.size();
            let percent = ratio(&size, &total) * 100.0;
            Some(SubnetShare {
                subnet,
                size,
                percent,
            })
        })
        .collect())
}

fn ratio(part: &BigUint, whole: &BigUint) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    match (part.to_f64(), whole.to_f64()) {
        (Some(p), Some(w)) if w > 0.0 => p / w,
        _ => 0.0,
    }
}

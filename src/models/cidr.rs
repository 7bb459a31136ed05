//! IP address and CIDR notation utilities.
//!
//! Provides [`Cidr`] for representing an IPv4 or IPv6 network with a prefix
//! length, along with the address primitives the engine is built on.
//! Arithmetic is done on the address as a `u128`, IPv4 addresses occupy the
//! low 32 bits.

use crate::error::{IpamError, Result};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Maximum prefix length for an IPv4 network.
pub const IPV4_BITS: u8 = 32;
/// Maximum prefix length for an IPv6 network.
pub const IPV6_BITS: u8 = 128;

/// Number of address bits for the family of `addr`.
pub fn family_bits(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => IPV4_BITS,
        IpAddr::V6(_) => IPV6_BITS,
    }
}

pub(crate) fn to_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(a) => u32::from(a) as u128,
        IpAddr::V6(a) => u128::from(a),
    }
}

/// Build an address of the given width from its integer value.
pub(crate) fn from_bits(bits: u128, width: u8) -> IpAddr {
    if width == IPV4_BITS {
        IpAddr::V4(Ipv4Addr::from(bits as u32))
    } else {
        IpAddr::V6(Ipv6Addr::from(bits))
    }
}

/// All-ones value for a family of `width` bits.
fn all_ones(width: u8) -> u128 {
    if width >= IPV6_BITS {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// Host bits for `prefix` (the inverse mask).
pub(crate) fn host_mask(prefix: u8, width: u8) -> u128 {
    let host_len = width.saturating_sub(prefix);
    all_ones(host_len)
}

/// Network mask for `prefix` within a family of `width` bits.
///
/// # Examples
/// ```
/// use ipam_blocks::models::prefix_mask;
/// assert_eq!(prefix_mask(24, 32), 0xFFFFFF00);
/// ```
pub fn prefix_mask(prefix: u8, width: u8) -> u128 {
    all_ones(width) & !host_mask(prefix, width)
}

/// Smallest prefix at which `bits` is a valid network address.
pub(crate) fn alignment_prefix(bits: u128, width: u8) -> u8 {
    let trailing_zeros = bits.trailing_zeros().min(width as u32) as u8;
    width - trailing_zeros
}

/// Returns the address following `ip`, masked to `prefix`.
///
/// Returns `None` when `ip` is the last address of its family.
pub fn next_address(ip: IpAddr, prefix: u8) -> Option<IpAddr> {
    let width = family_bits(ip);
    let bits = to_bits(ip);
    if bits == all_ones(width) {
        return None;
    }
    let next = (bits + 1) & prefix_mask(prefix.min(width), width);
    Some(from_bits(next, width))
}

/// Returns the highest (broadcast) address of the network.
pub fn last_address(network: &Cidr) -> IpAddr {
    from_bits(network.hi_bits(), network.width())
}

/// Compare two addresses as big-endian byte strings.
///
/// IPv4 addresses order before IPv6 addresses.
pub fn compare_address(a: IpAddr, b: IpAddr) -> Ordering {
    match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => a.octets().cmp(&b.octets()),
        (IpAddr::V6(a), IpAddr::V6(b)) => a.octets().cmp(&b.octets()),
        (IpAddr::V4(_), IpAddr::V6(_)) => Ordering::Less,
        (IpAddr::V6(_), IpAddr::V4(_)) => Ordering::Greater,
    }
}

/// True if `ip` lies inside `network`.
pub fn contains(network: &Cidr, ip: IpAddr) -> bool {
    if family_bits(ip) != network.width() {
        return false;
    }
    to_bits(ip) & prefix_mask(network.prefix, network.width()) == network.lo_bits()
}

/// True if both endpoints of `inner` lie inside `outer`.
pub fn contains_cidr(outer: &Cidr, inner: &Cidr) -> bool {
    contains(outer, inner.network()) && contains(outer, inner.last())
}

/// True if the closed address ranges of `a` and `b` share at least one address.
pub fn overlaps(a: &Cidr, b: &Cidr) -> bool {
    if a.width() != b.width() {
        return false;
    }
    a.lo_bits() <= b.hi_bits() && b.lo_bits() <= a.hi_bits()
}

/// Raw number of addresses in a network of `prefix` within `width` bits.
pub fn address_count(prefix: u8, width: u8) -> BigUint {
    BigUint::from(1u8) << width.saturating_sub(prefix) as usize
}

/// Clamp a big count to `u64`, saturating at `u64::MAX`.
pub fn saturating_u64(count: &BigUint) -> u64 {
    count.to_u64().unwrap_or(u64::MAX)
}

/// IP network in CIDR notation.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct Cidr {
    /// The address as written, host bits may be set.
    pub addr: IpAddr,
    /// The prefix length (0-32 for IPv4, 0-128 for IPv6).
    pub prefix: u8,
}

impl Cidr {
    /// Parse a CIDR string (e.g. "10.0.0.0/24" or "fd00::/64").
    pub fn new(addr_cidr: &str) -> Result<Cidr> {
        let trimmed = addr_cidr.trim();
        let (addr, prefix) = trimmed
            .split_once('/')
            .ok_or_else(|| IpamError::invalid_cidr(addr_cidr, "expected address/prefix"))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| IpamError::invalid_cidr(addr_cidr, format!("invalid address {addr}")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| IpamError::invalid_cidr(addr_cidr, format!("invalid prefix {prefix}")))?;
        let width = family_bits(addr);
        if prefix > width {
            return Err(IpamError::invalid_cidr(
                addr_cidr,
                format!("prefix /{prefix} is longer than {width} bits"),
            ));
        }
        Ok(Cidr { addr, prefix })
    }

    /// Build a network from an address and prefix, masking host bits.
    pub fn from_parts(addr: IpAddr, prefix: u8) -> Result<Cidr> {
        let width = family_bits(addr);
        if prefix > width {
            return Err(IpamError::InvalidPrefixLength { prefix, max: width });
        }
        Ok(Cidr { addr, prefix }.canonical())
    }

    /// Address width of this network's family.
    pub fn width(&self) -> u8 {
        family_bits(self.addr)
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    /// The lowest (network) address.
    pub fn network(&self) -> IpAddr {
        from_bits(self.lo_bits(), self.width())
    }

    /// The highest (broadcast) address.
    pub fn last(&self) -> IpAddr {
        last_address(self)
    }

    /// Same network with the host bits cleared.
    pub fn canonical(&self) -> Cidr {
        Cidr {
            addr: self.network(),
            prefix: self.prefix,
        }
    }

    /// Raw number of addresses covered.
    pub fn size(&self) -> BigUint {
        address_count(self.prefix, self.width())
    }

    pub(crate) fn lo_bits(&self) -> u128 {
        to_bits(self.addr) & prefix_mask(self.prefix, self.width())
    }

    pub(crate) fn hi_bits(&self) -> u128 {
        self.lo_bits() | host_mask(self.prefix, self.width())
    }
}

impl FromStr for Cidr {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Cidr> {
        Cidr::new(s)
    }
}

impl std::fmt::Display for Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl Serialize for Cidr {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Cidr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cidr::new(&s).map_err(de::Error::custom)
    }
}

//! Error types for the address-space engine.
//!
//! Every engine operation fails fast with a single [`IpamError`]. The
//! validator is the exception: it records problems as diagnostics instead
//! of returning them (see [`crate::processing::validator`]).

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, IpamError>;

/// Engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpamError {
    // CIDR errors
    #[error("Invalid CIDR '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("Invalid prefix length /{prefix}, must be between 0 and {max}")]
    InvalidPrefixLength { prefix: u8, max: u8 },

    #[error("Subnet {subnet} is not within block {block}")]
    OutOfBlockRange { subnet: String, block: String },

    #[error("CIDR {0} overlaps with existing {1}")]
    OverlapDetected(String, String),

    // Allocation errors
    #[error("No available space left in block {0}")]
    NoAvailableSpace(String),

    #[error("No free range in block {block} is large enough for a /{prefix}")]
    NoSuitableFreeBlock { block: String, prefix: u8 },

    // Lookup errors
    #[error("Block {0} not found")]
    BlockNotFound(String),

    #[error("Subnet {0} not found")]
    SubnetNotFound(String),

    #[error("Pattern {0} not found")]
    PatternNotFound(String),

    #[error("Block file for key {0} not found")]
    FileKeyNotFound(String),

    // Uniqueness and metadata errors
    #[error("{kind} {value} already exists")]
    DuplicateEntity { kind: &'static str, value: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid pattern name '{0}'")]
    InvalidPatternName(String),
}

impl IpamError {
    pub(crate) fn invalid_cidr(cidr: &str, reason: impl ToString) -> Self {
        IpamError::InvalidCidr {
            cidr: cidr.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, value: impl ToString) -> Self {
        IpamError::DuplicateEntity {
            kind,
            value: value.to_string(),
        }
    }
}

//! Block and subnet data model.

use super::Cidr;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subnet carved out of a [`Block`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Subnet {
    /// CIDR of the subnet, unique within its parent block.
    pub cidr: String,
    /// Name of the subnet, unique within its parent block.
    #[serde(default)]
    pub name: String,
    /// Region tag.
    #[serde(default)]
    pub region: String,
}

impl Subnet {
    pub fn new(cidr: &str, name: &str, region: &str) -> Subnet {
        Subnet {
            cidr: cidr.to_string(),
            name: name.to_string(),
            region: region.to_string(),
        }
    }

    /// Parse the subnet's CIDR string.
    pub fn network(&self) -> Result<Cidr> {
        Cidr::new(&self.cidr)
    }
}

/// A top-level managed CIDR range and the subnets allocated from it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// CIDR of the block, its identity.
    pub cidr: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Subnets in insertion order.
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

impl Block {
    pub fn new(cidr: &str, description: &str) -> Block {
        Block {
            cidr: cidr.to_string(),
            description: description.to_string(),
            subnets: vec![],
        }
    }

    /// Parse the block's CIDR string.
    pub fn network(&self) -> Result<Cidr> {
        Cidr::new(&self.cidr)
    }

    /// Whether this block is the one `cidr` refers to. Surrounding whitespace
    /// on either side is ignored.
    pub fn has_cidr(&self, cidr: &str) -> bool {
        self.cidr.trim() == cidr.trim()
    }

    /// Add a subnet to this block.
    pub fn add_subnet(&mut self, subnet: Subnet) {
        self.subnets.push(subnet);
    }

    /// Builder-style variant of [`Block::add_subnet`].
    pub fn with_subnet(mut self, cidr: &str, name: &str, region: &str) -> Block {
        self.add_subnet(Subnet::new(cidr, name, region));
        self
    }

    pub fn find_subnet(&self, cidr: &str) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.cidr == cidr)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.cidr, self.name, self.region)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({} subnets)",
            self.cidr,
            self.description,
            self.subnets.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_deserialize_defaults() {
        let json = r#"[{"cidr": "10.0.0.0/16"}, {"cidr": "10.1.0.0/16", "description": "two",
            "subnets": [{"cidr": "10.1.0.0/24", "name": "app"}]}]"#;
        let blocks: Vec<Block> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].description, "");
        assert!(blocks[0].subnets.is_empty());
        assert_eq!(blocks[1].subnets[0].name, "app");
        assert_eq!(blocks[1].subnets[0].region, "");
    }

    #[test]
    fn test_block_display() {
        let block = Block::new("10.0.0.0/16", "main").with_subnet("10.0.1.0/24", "app", "us-east1");
        assert_eq!(block.to_string(), "10.0.0.0/16 'main' (1 subnets)");
        assert_eq!(block.subnets[0].to_string(), "10.0.1.0/24 'app' (us-east1)");
        assert!(block.find_subnet("10.0.1.0/24").is_some());
        assert!(block.find_subnet("10.0.2.0/24").is_none());
    }

    #[test]
    fn test_block_has_cidr() {
        let block = Block::new("10.0.0.0/16 ", "main");
        assert!(block.has_cidr("10.0.0.0/16"));
        assert!(block.has_cidr(" 10.0.0.0/16"));
        assert!(!block.has_cidr("10.0.0.0/24"));
    }
}

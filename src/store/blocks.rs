//! Block file reading and writing.

use super::config::Config;
use crate::models::{Block, BlockFiles};
use serde_json::Value;
use std::error::Error;
use std::path::Path;

/// Read a block file as a list of blocks.
///
/// Parse errors name the JSON path of the offending value.
pub fn read_blocks(path: &Path) -> Result<Vec<Block>, Box<dyn Error>> {
    let json = read_file(path)?;
    if json.trim().is_empty() {
        log::warn!("Block file {} is empty", path.display());
        return Ok(vec![]);
    }
    let de = &mut serde_json::Deserializer::from_str(&json);
    let blocks: Vec<Block> = serde_path_to_error::deserialize(de)
        .map_err(|e| format!("Error parsing block file {}: {e}", path.display()))?;
    log::debug!("Read {} blocks from {}", blocks.len(), path.display());
    Ok(blocks)
}

/// Read a block file as untyped JSON, for structural validation.
pub fn read_document(path: &Path) -> Result<Value, Box<dyn Error>> {
    let json = read_file(path)?;
    if json.trim().is_empty() {
        return Ok(Value::Array(vec![]));
    }
    let document = serde_json::from_str(&json)
        .map_err(|e| format!("Error parsing block file {}: {e}", path.display()))?;
    Ok(document)
}

/// Write blocks to a block file, replacing its content.
pub fn write_blocks(path: &Path, blocks: &[Block]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(blocks)
        .map_err(|e| format!("Error serializing blocks: {e}"))?;
    std::fs::write(path, json)
        .map_err(|e| format!("Error writing block file {}: {e}", path.display()))?;
    log::debug!("Wrote {} blocks to {}", blocks.len(), path.display());
    Ok(())
}

/// Load every block file named in the config.
pub fn load_block_files(config: &Config) -> Result<BlockFiles, Box<dyn Error>> {
    let mut files = BlockFiles::new();
    for key in config.block_files.keys() {
        let path = config.block_file_path(key)?;
        files.insert(key.clone(), read_blocks(&path)?);
    }
    Ok(files)
}

/// Write the block files of `updated` that differ from `original`.
///
/// Returns the keys that were written.
pub fn save_changed(
    config: &Config,
    original: &BlockFiles,
    updated: &BlockFiles,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut written = vec![];
    for (key, blocks) in updated {
        if original.get(key) == Some(blocks) {
            continue;
        }
        write_blocks(&config.block_file_path(key)?, blocks)?;
        written.push(key.clone());
    }
    if !written.is_empty() {
        log::info!("Saved block files: {}", itertools::join(&written, ", "));
    }
    Ok(written)
}

fn read_file(path: &Path) -> Result<String, Box<dyn Error>> {
    if !path.is_file() {
        return Err(format!("Block file does not exist: {}", path.display()).into());
    }
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading block file {}: {e}", path.display()))?;
    Ok(json)
}

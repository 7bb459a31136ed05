//! Persistence of block files and configuration.
//!
//! This module handles all file I/O:
//! - [`config`] - The `ipam-config.json` file
//! - [`blocks`] - JSON block files

mod blocks;
mod config;

// Re-export public types and functions
pub use blocks::{load_block_files, read_blocks, read_document, save_changed, write_blocks};
pub use config::{
    add_block_file, config_dir, init_config, load_config, validate_file_key, write_config,
    Config, CONFIG_FILE_NAME, CONFIG_PATH_ENV, DEFAULT_FILE_KEY,
};

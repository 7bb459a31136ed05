//! Command line interface.
//!
//! Parses arguments with `clap` and runs each command against the files in
//! the config directory. Commands return their text output so they can be
//! tested without a terminal.

use crate::error::IpamError;
use crate::models::{BlockFiles, Target};
use crate::output;
use crate::processing::{
    block_layout, calculate, create_block, create_from_pattern, create_pattern, create_subnet_in,
    delete_block, delete_pattern, delete_subnet, find_available, find_block, find_subnet,
    get_pattern, list_subnets, resolve_target, subnet_shares, validate_all_documents,
};
use crate::store::{self, Config, DEFAULT_FILE_KEY};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "ipam-blocks",
    about = "Manage IP address blocks, subnets and allocation patterns",
    version
)]
pub struct Cli {
    /// Config directory, overrides IPAM_CONFIG_PATH
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level to stderr
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize and manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage IP blocks
    #[command(subcommand)]
    Block(BlockCommand),
    /// Manage subnets
    #[command(subcommand)]
    Subnet(SubnetCommand),
    /// Manage allocation patterns
    #[command(subcommand)]
    Pattern(PatternCommand),
    /// Validate block files
    #[command(subcommand)]
    Check(CheckCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Create the config file and a first block file
    Init {
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        key: String,
    },
    /// Register another block file
    AddBlockFile {
        #[arg(long)]
        key: String,
        /// Path of the block file, relative to the config directory
        #[arg(long)]
        path: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlockCommand {
    Create {
        #[arg(long)]
        cidr: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        file: String,
    },
    List,
    Show {
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        file: Option<String>,
    },
    Delete {
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        file: Option<String>,
        /// Delete even when the block still holds subnets
        #[arg(long)]
        force: bool,
    },
    /// List the free CIDRs of a block
    Available {
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        file: Option<String>,
    },
    /// Show utilization of one block, or of every block
    Utilization {
        #[arg(long)]
        cidr: Option<String>,
        #[arg(long)]
        file: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubnetCommand {
    Create {
        #[arg(long)]
        block: String,
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        region: String,
    },
    /// Carve the next free subnet sized by a pattern
    CreateFromPattern {
        #[arg(long)]
        pattern: String,
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        file: String,
    },
    List {
        #[arg(long)]
        block: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
    Show {
        #[arg(long)]
        cidr: String,
    },
    Delete {
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PatternCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cidr_size: u8,
        #[arg(long, default_value = "")]
        environment: String,
        #[arg(long)]
        region: String,
        #[arg(long)]
        block: String,
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        file: String,
    },
    List {
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        file: String,
    },
    Show {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        file: String,
    },
    Delete {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = DEFAULT_FILE_KEY)]
        file: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate one block file, or all of them
    Blocks {
        file_key: Option<String>,
        #[arg(long)]
        all: bool,
    },
}

/// Text output of a command and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: String,
    pub success: bool,
}

impl Outcome {
    fn ok(output: impl Into<String>) -> Outcome {
        Outcome {
            output: output.into(),
            success: true,
        }
    }
}

/// Run a parsed command line.
pub fn run(cli: &Cli) -> Result<Outcome, Box<dyn Error>> {
    let dir = store::config_dir(cli.config.as_deref())?;
    log::debug!("Using config directory {}", dir.display());

    match &cli.command {
        Commands::Config(cmd) => run_config(&dir, cmd),
        Commands::Block(cmd) => run_block(&store::load_config(&dir)?, cmd),
        Commands::Subnet(cmd) => run_subnet(&store::load_config(&dir)?, cmd),
        Commands::Pattern(cmd) => run_pattern(&store::load_config(&dir)?, cmd),
        Commands::Check(cmd) => run_check(&store::load_config(&dir)?, cmd),
    }
}

fn run_config(dir: &Path, cmd: &ConfigCommand) -> Result<Outcome, Box<dyn Error>> {
    match cmd {
        ConfigCommand::Init { key } => {
            let config = store::init_config(dir, key)?;
            Ok(Outcome::ok(format!(
                "Configuration initialized successfully:\n  Config file: {}\n  Block file: {} ({key})\n",
                config.config_file.display(),
                config.block_file_path(key)?.display()
            )))
        }
        ConfigCommand::AddBlockFile { key, path } => {
            let config = store::load_config(dir)?;
            let config = store::add_block_file(&config, key, path.as_deref())?;
            store::write_config(&config)?;
            Ok(Outcome::ok(format!(
                "Added new block file:\n  Name: {key}\n  Path: {}\n",
                config.block_file_path(key)?.display()
            )))
        }
    }
}

fn run_block(config: &Config, cmd: &BlockCommand) -> Result<Outcome, Box<dyn Error>> {
    let files = store::load_block_files(config)?;
    match cmd {
        BlockCommand::Create {
            cidr,
            description,
            file,
        } => {
            let updated = create_block(&files, file, cidr, description)?;
            store::save_changed(config, &files, &updated)?;
            Ok(Outcome::ok(format!("Block {cidr} added to file {file}\n")))
        }
        BlockCommand::List => Ok(Outcome::ok(output::render_blocks(&files))),
        BlockCommand::Show { cidr, file } => {
            let found = find_block(&files, cidr, &Target::from_key(file.as_deref()))?;
            let block = &files[&found.file_key][found.index];
            Ok(Outcome::ok(output::render_block(
                block,
                &calculate(block)?,
                &block_layout(block)?,
            )))
        }
        BlockCommand::Delete { cidr, file, force } => {
            let target = Target::from_key(file.as_deref());
            let found = find_block(&files, cidr, &target)?;
            let subnets = files[&found.file_key][found.index].subnets.len();
            if subnets > 0 && !*force {
                return Err(format!("Block {cidr} still holds {subnets} subnets, use --force to delete it").into());
            }
            let updated = delete_block(&files, cidr, &target)?;
            store::save_changed(config, &files, &updated)?;
            Ok(Outcome::ok(format!("Block {cidr} deleted from file {}\n", found.file_key)))
        }
        BlockCommand::Available { cidr, file } => {
            let found = find_block(&files, cidr, &Target::from_key(file.as_deref()))?;
            let block = &files[&found.file_key][found.index];
            Ok(Outcome::ok(output::render_available(block, &find_available(block)?)))
        }
        BlockCommand::Utilization { cidr: Some(cidr), file } => {
            let found = find_block(&files, cidr, &Target::from_key(file.as_deref()))?;
            let block = &files[&found.file_key][found.index];
            Ok(Outcome::ok(output::render_utilization(
                &calculate(block)?,
                &subnet_shares(block)?,
            )))
        }
        BlockCommand::Utilization { cidr: None, file } => {
            let keys = resolve_target(&files, &Target::from_key(file.as_deref()))?;
            let mut rows = vec![];
            for block in keys.iter().flat_map(|key| &files[key]) {
                match calculate(block) {
                    Ok(u) => rows.push(u),
                    Err(e) => log::warn!("Skipping block {}: {e}", block.cidr),
                }
            }
            Ok(Outcome::ok(output::render_utilization_summary(&rows)))
        }
    }
}

fn run_subnet(config: &Config, cmd: &SubnetCommand) -> Result<Outcome, Box<dyn Error>> {
    let files = store::load_block_files(config)?;
    match cmd {
        SubnetCommand::Create {
            block,
            cidr,
            name,
            region,
        } => {
            let updated = create_subnet_in(&files, block, cidr, name, region)?;
            store::save_changed(config, &files, &updated)?;
            Ok(Outcome::ok(format!("Subnet {cidr} '{name}' created in block {block}\n")))
        }
        SubnetCommand::CreateFromPattern { pattern, file } => {
            let blocks = files
                .get(file)
                .ok_or_else(|| IpamError::FileKeyNotFound(file.clone()))?;
            let patterns = config.patterns.get(file).cloned().unwrap_or_default();
            let allocation = create_from_pattern(pattern, &patterns, blocks)?;

            let mut updated: BlockFiles = files.clone();
            updated.insert(file.clone(), allocation.blocks);
            store::save_changed(config, &files, &updated)?;
            Ok(Outcome::ok(format!(
                "Subnet {} '{}' created from pattern {pattern}\n",
                allocation.subnet.cidr, allocation.subnet.name
            )))
        }
        SubnetCommand::List { block, region } => {
            let entries = list_subnets(&files, block.as_deref(), region.as_deref());
            Ok(Outcome::ok(output::render_subnets(&entries)))
        }
        SubnetCommand::Show { cidr } => Ok(Outcome::ok(output::render_subnet(&find_subnet(&files, cidr)?))),
        SubnetCommand::Delete { cidr, force } => {
            if !*force {
                return Err(format!("Refusing to delete subnet {cidr} without --force").into());
            }
            let updated = delete_subnet(&files, cidr)?;
            store::save_changed(config, &files, &updated)?;
            Ok(Outcome::ok(format!("Subnet {cidr} deleted\n")))
        }
    }
}

fn run_pattern(config: &Config, cmd: &PatternCommand) -> Result<Outcome, Box<dyn Error>> {
    match cmd {
        PatternCommand::Create {
            name,
            cidr_size,
            environment,
            region,
            block,
            file,
        } => {
            let files = store::load_block_files(config)?;
            let mut updated = config.clone();
            updated.patterns = create_pattern(
                &config.patterns,
                &files,
                file,
                name,
                *cidr_size,
                environment,
                region,
                block,
            )?;
            store::write_config(&updated)?;
            Ok(Outcome::ok(format!("Pattern {name} created for file {file}\n")))
        }
        PatternCommand::List { file } => Ok(Outcome::ok(output::render_patterns(config.patterns.get(file)))),
        PatternCommand::Show { name, file } => {
            Ok(Outcome::ok(output::render_pattern(get_pattern(&config.patterns, file, name)?)))
        }
        PatternCommand::Delete { name, file } => {
            let mut updated = config.clone();
            updated.patterns = delete_pattern(&config.patterns, file, name)?;
            store::write_config(&updated)?;
            Ok(Outcome::ok(format!("Pattern {name} deleted from file {file}\n")))
        }
    }
}

fn run_check(config: &Config, cmd: &CheckCommand) -> Result<Outcome, Box<dyn Error>> {
    let CheckCommand::Blocks { file_key, all } = cmd;
    if config.block_files.is_empty() {
        return Ok(Outcome::ok("No block files configured.\n"));
    }
    let target = if *all {
        Target::All
    } else {
        Target::from_key(file_key.as_deref())
    };

    let mut documents = BTreeMap::new();
    for key in config.block_files.keys() {
        documents.insert(key.clone(), store::read_document(&config.block_file_path(key)?)?);
    }
    let reports = validate_all_documents(&documents, &config.patterns, &target)?;

    let output = match reports.as_slice() {
        [single] => output::render_validation(single),
        many => output::render_validation_summary(many),
    };
    let errors: usize = reports.iter().map(|r| r.error_count).sum();
    if errors > 0 {
        log::warn!("Validation found {errors} errors");
    }
    Ok(Outcome {
        output,
        success: errors == 0,
    })
}

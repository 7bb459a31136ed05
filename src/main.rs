use clap::Parser;
use ipam_blocks::cli::{run, Cli};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::Path;

const LOG_CONFIG: &str = "log4rs.yml";

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.debug)?;
    log::info!("#Start main()");

    let outcome = run(&cli)?;
    print!("{}", outcome.output);
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Log from `log4rs.yml` when present, else to stderr. `--debug` always logs to stderr at debug level.
fn init_logging(debug: bool) -> Result<(), Box<dyn Error>> {
    if !debug && Path::new(LOG_CONFIG).exists() {
        log4rs::init_file(LOG_CONFIG, Default::default())
            .map_err(|e| format!("Error initializing log4rs from {LOG_CONFIG}: {e}"))?;
        return Ok(());
    }

    let level = if debug { LevelFilter::Debug } else { LevelFilter::Warn };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| format!("Error building log config: {e}"))?;
    log4rs::init_config(config).map_err(|e| format!("Error initializing log4rs: {e}"))?;
    Ok(())
}

//! Logger setup for the `miner` binary.
//!
//! The terminal only gets warnings so the progress bar stays readable; the
//! full log goes to `./miner.log` when file logging is enabled.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./miner.log";

pub enum LogDestination {
    Terminal,
    /// Terminal for warnings, `./miner.log` for everything.
    TerminalAndFile,
}

pub fn destination(log_to_file: bool) -> LogDestination {
    if log_to_file {
        LogDestination::TerminalAndFile
    } else {
        LogDestination::Terminal
    }
}

pub fn initialize(destination: LogDestination, verbose: bool) {
    let file_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let term_level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let LogDestination::TerminalAndFile = destination {
        if let Some(file_logger) = create_file_logger(file_level, config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("hyper")
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

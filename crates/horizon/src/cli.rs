//! Command-line interface handling for the Horizon interest simulator.
//!
//! This module provides command-line argument parsing using the `clap` crate.
//! Every option overrides a value from the configuration file.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// This structure holds all the command-line options that can be used to
/// override configuration file settings.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the interest strategy
    pub strategy: Option<String>,
    /// Optional limit on simulated ticks
    pub ticks: Option<u64>,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    ///
    /// # Returns
    ///
    /// A `CliArgs` instance containing all parsed command-line options.
    pub fn parse() -> Self {
        let matches = Command::new("Horizon Interest Simulator")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Drives the Horizon interest engine against a simulated world")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("strategy")
                    .short('s')
                    .long("strategy")
                    .value_name("STRATEGY")
                    .help("Interest strategy")
                    .value_parser(["distance", "scene", "match", "spatial_hash", "scene_distance"]),
            )
            .arg(
                Arg::new("ticks")
                    .short('t')
                    .long("ticks")
                    .value_name("COUNT")
                    .help("Stop after this many simulation ticks")
                    .value_parser(clap::value_parser!(u64)),
            )
            .get_matches();

        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            strategy: matches.get_one::<String>("strategy").cloned(),
            ticks: matches.get_one::<u64>("ticks").copied(),
        }
    }
}

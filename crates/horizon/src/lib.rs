//! # Horizon Interest Simulator - Main Entry Point
//!
//! Runs the Horizon interest engine against a simulated world and reports
//! what it would replicate. This entry point handles CLI parsing,
//! configuration loading, and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! horizon
//!
//! # Specify custom configuration
//! horizon --config interest.toml
//!
//! # Try another strategy for a fixed number of ticks
//! horizon --strategy scene_distance --ticks 2000 --log-level debug
//!
//! # JSON logging
//! horizon --json-logs
//! ```
//!
//! ## Configuration
//!
//! The simulator loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The simulation stops between ticks on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;
mod simulation;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the simulator.
///
/// Handles the complete application lifecycle including:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging comes up before anything else, so read its settings first.
    let mut logging_config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default()
        .logging;
    if let Some(level) = &args.log_level {
        logging_config.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging_config, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{LoggingSettings, SimulationSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_interest::StrategyKind;
    use std::path::PathBuf;

    fn args_for(config_path: PathBuf) -> CliArgs {
        CliArgs {
            config_path,
            log_level: None,
            json_logs: false,
            strategy: None,
            ticks: None,
        }
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            log_level: Some("debug".to_string()),
            json_logs: true,
            strategy: Some("spatial_hash".to_string()),
            ticks: Some(42),
            ..args_for(PathBuf::from("test.toml"))
        };

        app::apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.interest.strategy, StrategyKind::SpatialHash);
        assert_eq!(config.simulation.max_ticks, Some(42));
    }

    #[test]
    fn test_cli_rejects_unknown_strategy() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            strategy: Some("telepathy".to_string()),
            ..args_for(PathBuf::from("test.toml"))
        };
        assert!(app::apply_overrides(&mut config, &args).is_err());
    }

    #[tokio::test]
    async fn test_application_steps_until_tick_limit() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            strategy: Some("scene".to_string()),
            ticks: Some(30),
            ..args_for(dir.path().join("config.toml"))
        };

        let mut app = Application::new(args).await.unwrap();
        assert!(dir.path().join("config.toml").exists());
        assert_eq!(app.engine().strategy_kind(), StrategyKind::Scene);

        let mut steps = 0;
        while !app.step() {
            steps += 1;
            assert!(steps < 30, "tick limit not honored");
        }
        assert_eq!(steps, 29);

        // 30 ticks at 20 Hz is 1.5s of simulated time: at least one rebuild.
        assert!(app.engine().stats().tick_rebuilds >= 1);
        assert!(app.replication_log().shown > 0);
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[interest]\nvisibility_radius = -5.0\n").await.unwrap();

        assert!(Application::new(args_for(path)).await.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_at_tick_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[simulation]\ntick_rate_hz = 200\nplayers = 4\nprops = 20\n")
            .await
            .unwrap();

        let args = CliArgs {
            ticks: Some(10),
            ..args_for(path)
        };
        let app = Application::new(args).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(10), app.run())
            .await
            .expect("run finished before timeout")
            .unwrap();
    }
}

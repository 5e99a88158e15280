//! Tracing setup for the simulator.
//!
//! The interest engine logs every rebuild at `debug`, which drowns everything
//! else at 20 Hz, so its target gets its own level (`logging.engine_level`).

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ENGINE_TARGET: &str = "horizon_interest";

/// Filter directives for `config`, e.g. `info,horizon_interest=warn`.
fn filter_directives(config: &LoggingSettings) -> String {
    match &config.engine_level {
        Some(engine_level) => format!("{},{ENGINE_TARGET}={engine_level}", config.level),
        None => config.level.clone(),
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the config file.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), Box<dyn std::error::Error>> {
    let directives = filter_directives(config);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directives))?;

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_target(false))
            .try_init()?;
    }

    info!("🔧 Logging initialized: {}", directives);
    Ok(())
}

/// Displays the startup banner.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║        🌟 HORIZON INTEREST SIM 🌟        ║");
    info!("║                 v{:<24}║", version);
    info!("║                                          ║");
    info!("║  👁️  Observer sets per entity              ║");
    info!("║  🎯 Distance / Scene / Match / Grid      ║");
    info!("║  ⚡ Dirty-partition rebuilds             ║");
    info!("║                                          ║");
    info!("╚══════════════════════════════════════════╝");
}

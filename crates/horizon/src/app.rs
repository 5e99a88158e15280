//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that loads configuration,
//! builds the interest engine and the simulated world, and runs the tick loop
//! until the tick limit or a shutdown signal.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::setup_signal_handlers,
    simulation::{ReplicationLog, Simulation},
};
use horizon_interest::{InterestEngine, StrategyKind};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Main application struct.
///
/// Owns the interest engine, the simulated world it observes, and the
/// replication log that stands in for a network layer.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    engine: InterestEngine,
    simulation: Simulation,
    log: ReplicationLog,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Build the engine and the simulated world
    /// 5. Register every entity with the engine
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        apply_overrides(&mut config, &args)?;

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let mut engine = InterestEngine::from_config(config.interest.clone())?;
        let simulation = Simulation::new(config.simulation.clone());
        let mut log = ReplicationLog::default();
        simulation.spawn_all(&mut engine, &mut log);

        info!(
            "🌍 Spawned {} entities for {} connections ({} initial spawns replicated)",
            simulation.world().entities.len(),
            simulation.world().connections.len(),
            log.shown
        );

        Ok(Self {
            config,
            engine,
            simulation,
            log,
        })
    }

    /// Runs the tick loop until the tick limit or a shutdown signal.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Horizon interest simulation");
        self.log_configuration_summary();

        let mut interval = tokio::time::interval(Duration::from_secs_f64(self.config.simulation.tick_seconds()));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = setup_signal_handlers();
        tokio::pin!(shutdown);

        info!("✅ Simulation running");
        info!("🛑 Press Ctrl+C to stop");

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    info!("🛑 Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {
                    if self.step() {
                        info!("🏁 Tick limit reached after {} ticks", self.simulation.ticks());
                        break;
                    }
                }
            }
        }

        self.log_final_statistics();
        Ok(())
    }

    /// Advances the simulation and the engine by one tick.
    ///
    /// Returns `true` once the configured tick limit is reached.
    pub fn step(&mut self) -> bool {
        self.simulation.step(&mut self.engine, &mut self.log);

        let dt = self.config.simulation.tick_seconds();
        if let Some(report) = self.engine.tick(dt, self.simulation.world(), &mut self.log) {
            debug!(
                "Rebuild ({:?}): {} evaluated, +{} / -{} in {}us",
                report.scope, report.entities_evaluated, report.shown, report.hidden, report.duration_us
            );
        }

        let ticks = self.simulation.ticks();
        let stats_every = self.config.simulation.stats_interval_secs * u64::from(self.config.simulation.tick_rate_hz);
        if stats_every > 0 && ticks % stats_every == 0 {
            self.log_periodic_statistics();
        }

        self.config.simulation.max_ticks.is_some_and(|limit| ticks >= limit)
    }

    pub fn engine(&self) -> &InterestEngine {
        &self.engine
    }

    pub fn replication_log(&self) -> &ReplicationLog {
        &self.log
    }

    fn log_configuration_summary(&self) {
        let interest = &self.config.interest;
        let sim = &self.config.simulation;
        info!("📋 Configuration Summary:");
        info!("  👁️ Strategy: {}", interest.strategy);
        info!("  ⏱️ Rebuild interval: {}s", interest.update_interval_secs);
        info!("  📏 Visibility radius: {} ({:?})", interest.visibility_radius, interest.check_method);
        info!("  🔁 Tick rate: {} Hz", sim.tick_rate_hz);
        info!(
            "  🌍 World: {:.0}x{:.0} units, {} scenes, {} matches",
            sim.world_extent, sim.world_extent, sim.scenes, sim.matches
        );
        match sim.max_ticks {
            Some(limit) => info!("  🏁 Tick limit: {}", limit),
            None => info!("  🏁 Tick limit: none"),
        }
    }

    fn log_periodic_statistics(&self) {
        let stats = self.engine.stats();
        let strategy = self.engine.strategy_stats();
        info!(
            "📊 Interest - {} links over {} entities | +{} / -{} total | last rebuild {}us | {} partitions, {} cells",
            stats.observer_links,
            stats.observed_entities,
            stats.total_shown,
            stats.total_hidden,
            stats.last_rebuild_us,
            strategy.partitions,
            strategy.occupied_cells
        );
    }

    fn log_final_statistics(&self) {
        let stats = self.engine().stats();
        let log = self.replication_log();
        info!("📊 Final Statistics:");
        info!("  - Ticks simulated: {}", self.simulation.ticks());
        info!("  - Rebuilds: {} interval, {} forced", stats.tick_rebuilds, stats.full_rebuilds);
        info!("  - Replicated spawns: {}", log.shown);
        info!("  - Replicated despawns: {}", log.hidden);
        info!("  - Strategy failures: {}", stats.total_failures);
        for connection in self.simulation.connections() {
            debug!("  - {} sees {} entities", connection, log.visible_to(connection));
        }
    }
}

/// Applies command-line overrides to a loaded configuration.
pub fn apply_overrides(config: &mut AppConfig, args: &CliArgs) -> Result<(), String> {
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }

    if args.json_logs {
        config.logging.json_format = true;
    }

    if let Some(strategy) = &args.strategy {
        config.interest.strategy = strategy.parse::<StrategyKind>()?;
    }

    if let Some(ticks) = args.ticks {
        config.simulation.max_ticks = Some(ticks);
    }

    Ok(())
}

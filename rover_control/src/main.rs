//! # Rover
//!
//! Drives the four-axis stepper rig (left/right drive wheels, pan, tilt)
//! from a local joystick and a UDP control stream.
//!
//! Startup order: config → output driver → step engine (claims all lines)
//! → input workers → control loop on the main thread. SIGINT / SIGTERM
//! stop the control loop; the axis workers are then joined first, the
//! input workers second.
//!
//! Exit status is 1 if the output driver cannot be acquired, a line cannot
//! be claimed, or an axis worker stopped on a GPIO fault; 0 otherwise.

use clap::Parser;
use rover_common::config::{ConfigError, ConfigLoader, RoverConfig};
use rover_common::consts::DEFAULT_CONFIG_PATH;
use rover_common::shutdown::ShutdownToken;
use rover_control::netinfo;
use rover_control::{ControlError, ControlLoop, InputManager};
use rover_hal::drivers::{GPIOCHIP_DRIVER, SIMULATION_DRIVER};
use rover_hal::{DriverRegistry, EngineOptions, StepEngine, rt};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Rover: joystick / network driven stepper rig
#[derive(Parser, Debug)]
#[command(name = "rover")]
#[command(author)]
#[command(version)]
#[command(about = "Real-time four-axis stepper control from joystick and UDP input")]
struct Args {
    /// Joystick device path (overrides `input.joystick_path`).
    joystick: Option<PathBuf>,

    /// Path to rover.toml. Without it the default path is tried, then
    /// built-in defaults.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use the in-memory simulation driver instead of GPIO hardware.
    #[arg(long)]
    simulate: bool,

    /// Output driver by name (default: gpiochip).
    #[arg(long, value_name = "NAME", conflicts_with = "simulate")]
    driver: Option<String>,

    /// SCHED_FIFO priority for axis threads; 0 leaves the policy untouched.
    /// Only effective when built with the `rt` feature.
    #[arg(long, default_value_t = 0)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args);

    let level = if args.verbose {
        Level::DEBUG
    } else {
        loaded
            .as_ref()
            .map_or(Level::INFO, |config| config.shared.log_level.into())
    };
    setup_tracing(&args, level);

    info!("Rover v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Rover shutdown complete");
}

/// Explicit `--config` must exist; the default path is optional.
fn load_config(args: &Args) -> Result<RoverConfig, ConfigError> {
    match &args.config {
        Some(path) => RoverConfig::load(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                RoverConfig::load(default)
            } else {
                Ok(RoverConfig::default())
            }
        }
    }
}

fn run(args: &Args, mut config: RoverConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &args.joystick {
        config.input.joystick_path = path.clone();
    }
    config.validate()?;
    info!(
        "Config OK: gpiochip{}, max {} steps/s, joystick {}, UDP port {}",
        config.gpio.chip,
        config.stepper.max_speed_steps_per_sec,
        config.input.joystick_path.display(),
        config.input.udp_port
    );

    netinfo::log_interfaces(config.input.udp_port);

    // Setup signal handler for graceful shutdown.
    let shutdown = ShutdownToken::new();
    let token = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        token.request();
    })?;

    if args.rt_priority > 0 {
        if let Err(e) = rt::lock_memory() {
            warn!("{e}");
        }
    }

    let driver_name = if args.simulate {
        SIMULATION_DRIVER
    } else {
        args.driver.as_deref().unwrap_or(GPIOCHIP_DRIVER)
    };
    let registry = DriverRegistry::with_builtin_drivers();
    let output = registry.create_driver(driver_name, &config.gpio)?;

    let options = EngineOptions {
        rt_priority: args.rt_priority,
        ..EngineOptions::default()
    };
    let mut engine = StepEngine::start_with(output, &config, shutdown.clone(), options)?;
    let mut inputs = InputManager::start(&config.input, shutdown.clone())?;

    let mut control = ControlLoop::new(inputs.axes(), engine.bank(), &config);
    control.run(&shutdown);

    engine.stop();
    inputs.stop();

    if engine.faulted() {
        return Err(ControlError::Faulted.into());
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

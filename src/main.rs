use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod driver;
mod duty_cycle;
mod error;
mod frame;
mod output;

use config::{parse_levels, Config, Mode};
use driver::Driver;
use output::LedOutput;

#[derive(Parser)]
#[command(name = "run_leds")]
#[command(about = "Software PWM for an 8-LED register over a serial link\n\nEach tick sends the frame [0x03, bits] with one bit per LED.", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    config: Option<String>,

    /// Serial device, overrides the config file
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(long)]
    baud: Option<u32>,

    /// Frame loop to run
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Comma separated brightness levels (0-8) for LED 0 through 7
    #[arg(long)]
    levels: Option<String>,

    /// Stop after sending this many frames
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Enable debug output (statistics)
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long)]
    ddebug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ddebug implies debug
    let debug = cli.debug || cli.ddebug;
    init_tracing(debug, cli.ddebug);

    let config = load_config(&cli)?;

    info!(
        "Opening {} @ {} baud ({:?} mode)",
        config.serial.port, config.serial.baud_rate, config.mode
    );
    let output = LedOutput::open(&config.serial)?;
    let mut driver = Driver::new(output, &config, debug);

    // Set up Ctrl-C handler with graceful shutdown
    let running = driver.get_running_flag();
    let result = ctrlc::set_handler(move || {
        info!("Shutting down...");
        running.store(false, Ordering::Relaxed);
    });

    if let Err(e) = result {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    // Run driver (blocks until shutdown, tick limit or write failure)
    let result = driver.run();

    // Turn off LEDs whether or not the loop failed
    driver.shutdown();

    result.context("LED output stopped")?;
    Ok(())
}

fn init_tracing(debug: bool, ddebug: bool) {
    let default_level = if ddebug {
        "trace"
    } else if debug {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file (or defaults) with command line overrides applied
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let config_data = fs::read_to_string(path)
                .context(format!("Failed to read config file {}", path))?;
            serde_json::from_str(&config_data)
                .context(format!("Failed to parse config file {}", path))?
        }
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(levels) = &cli.levels {
        config.levels = parse_levels(levels)?;
    }
    if cli.max_ticks.is_some() {
        config.max_ticks = cli.max_ticks;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_runs_pwm_on_defaults() {
        let cli = Cli::parse_from(["run_leds"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.mode, Mode::Pwm);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "run_leds",
            "--port",
            "/dev/ttyACM1",
            "--baud",
            "9600",
            "--mode",
            "counter",
            "--levels",
            "8,8,8,8,0,0,0,0",
            "--max-ticks",
            "100",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.mode, Mode::Counter);
        assert_eq!(config.levels[0].value(), 8);
        assert_eq!(config.levels[7].value(), 0);
        assert_eq!(config.max_ticks, Some(100));
    }

    #[test]
    fn test_bad_levels_flag_is_an_error() {
        let cli = Cli::parse_from(["run_leds", "--levels", "1,2,3,4,5,6,7,9"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::parse_from(["run_leds", "/nonexistent/run_leds.json"]);
        assert!(load_config(&cli).is_err());
    }
}

// src/main.rs
use std::path::PathBuf;

use ad5933_sweep::drivers::{open_serial, CommandChannel, SimulatedAnalyzer, SimulatedLoad};
use ad5933_sweep::{AppConfig, SweepController};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

/// Calibrates an AD5933 impedance analyzer against a reference resistor and
/// prints the gain/phase tables as JSON.
#[derive(Parser, Debug)]
#[command(name = "ad5933-sweep", version)]
struct Cli {
    /// Serial port of the analyzer, e.g. /dev/ttyACM0 or COM4
    #[arg(required_unless_present = "simulate")]
    port: Option<String>,
    /// JSON file with `channel` and `sweep` sections
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Reference resistance in ohms
    #[arg(long, value_name = "OHMS")]
    reference: Option<f64>,
    /// First sweep frequency
    #[arg(long, value_name = "HZ")]
    start: Option<u32>,
    /// Frequency step
    #[arg(long, value_name = "HZ")]
    increment: Option<u32>,
    /// Number of sweep points
    #[arg(long, value_name = "N")]
    points: Option<u32>,
    /// Read timeout per response
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
    /// Sweep a simulated analyzer with the reference resistor attached
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(ohms) = self.reference {
            cfg.sweep.reference_resistance = ohms;
        }
        if let Some(hz) = self.start {
            cfg.sweep.start_frequency = hz;
        }
        if let Some(hz) = self.increment {
            cfg.sweep.frequency_increment = hz;
        }
        if let Some(n) = self.points {
            cfg.sweep.num_points = n;
        }
        if let Some(ms) = self.timeout_ms {
            cfg.channel.read_timeout_ms = ms;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    cli.apply(&mut cfg);

    let channel: Box<dyn CommandChannel> = if cli.simulate {
        info!("using simulated analyzer");
        Box::new(SimulatedAnalyzer::new(SimulatedLoad::resistor(
            cfg.sweep.reference_resistance,
        )))
    } else {
        let port = cli.port.as_deref().context("no serial port given")?;
        Box::new(
            open_serial(port, &cfg.channel)
                .with_context(|| format!("failed to open serial port {port}"))?,
        )
    };

    let result = SweepController::new(channel)
        .calibrate(&cfg.sweep)
        .context("calibration sweep failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

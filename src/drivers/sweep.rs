// src/drivers/sweep.rs
use log::{debug, info, warn};

use crate::drivers::calibration;
use crate::drivers::channel::CommandChannel;
use crate::drivers::command::{parse_measurement, Command};
use crate::drivers::error::{SweepError, SweepStep};
use crate::types::{ImpedancePoint, RawPoint, SweepConfig, SweepResult};

/// Drives one instrument through lock-step frequency sweeps.
///
/// The instrument neither buffers nor tags responses, so every measurement
/// request is answered before the next command goes out. The controller owns
/// its channel for as long as it lives; sweeps on it never overlap.
pub struct SweepController<C: CommandChannel> {
    channel: C,
}

impl<C: CommandChannel> SweepController<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Configures the instrument and collects one raw point per frequency step.
    ///
    /// Any failure aborts the sweep; points gathered so far are dropped.
    pub fn run_sweep(&mut self, config: &SweepConfig) -> Result<Vec<RawPoint>, SweepError> {
        config.validate()?;
        info!(
            "sweep: {} points from {} Hz in {} Hz steps",
            config.num_points, config.start_frequency, config.frequency_increment
        );
        let result = self.collect(config);
        match &result {
            Ok(points) => info!("sweep complete: {} points", points.len()),
            Err(e) => warn!("sweep aborted: {e}"),
        }
        result
    }

    /// Sweeps against the reference resistor and returns the gain/phase tables.
    pub fn calibrate(&mut self, config: &SweepConfig) -> Result<SweepResult, SweepError> {
        let points = self.run_sweep(config)?;
        calibration::calibrate(&points, config.reference_resistance)
    }

    /// Sweeps an unknown load and converts it with a previous calibration.
    pub fn measure(
        &mut self,
        config: &SweepConfig,
        calibration: &SweepResult,
    ) -> Result<Vec<ImpedancePoint>, SweepError> {
        let points = self.run_sweep(config)?;
        calibration.impedance(&points)
    }

    fn collect(&mut self, config: &SweepConfig) -> Result<Vec<RawPoint>, SweepError> {
        for cmd in configuration_commands(config) {
            self.send(cmd, SweepStep::Configure(cmd))?;
        }
        let count = config.num_points as usize;
        // sized by the replies received, not by num_points
        let mut points = Vec::new();
        for index in 0..count {
            points.push(self.measure_point(index)?);
            // no advance after the final point
            if index + 1 < count {
                self.send(Command::IncrFreq, SweepStep::Advance { index })?;
            }
        }
        Ok(points)
    }

    fn measure_point(&mut self, index: usize) -> Result<RawPoint, SweepError> {
        let step = SweepStep::Measure { index };
        self.send(Command::MeasureRaw, step)?;
        let line = self
            .channel
            .read_line()
            .map_err(|e| SweepError::channel(step, e))?;
        debug!("<- {line}");
        parse_measurement(index, &line)
    }

    fn send(&mut self, cmd: Command, step: SweepStep) -> Result<(), SweepError> {
        let line = cmd.render();
        debug!("-> {line}");
        self.channel
            .send_line(&line)
            .map_err(|e| SweepError::channel(step, e))
    }
}

/// The five commands that set up a sweep, in the order the instrument expects them.
pub fn configuration_commands(config: &SweepConfig) -> [Command; 5] {
    [
        Command::SetStartFreq(config.start_frequency),
        Command::SetFreqIncr(config.frequency_increment),
        Command::SetNumPoints(config.num_points),
        Command::Init,
        Command::Start,
    ]
}

/// Runs one sweep over `channel` and returns the raw points.
pub fn run_sweep<C: CommandChannel>(
    channel: C,
    config: &SweepConfig,
) -> Result<Vec<RawPoint>, SweepError> {
    SweepController::new(channel).run_sweep(config)
}

/// Runs one sweep against the reference resistor and calibrates it.
pub fn measure_gain_phase<C: CommandChannel>(
    channel: C,
    config: &SweepConfig,
) -> Result<SweepResult, SweepError> {
    SweepController::new(channel).calibrate(config)
}

// src/drivers/sim.rs
use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::io;

use log::trace;

use crate::drivers::channel::CommandChannel;
use crate::drivers::command::Command;

/// Load connected across the simulated analyzer's terminals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedLoad {
    pub resistance: f64,          // ohms
    pub capacitance: Option<f64>, // farads, in series with the resistance
    /// Raw counts per siemens of admittance.
    pub scale: f64,
}

impl SimulatedLoad {
    pub const DEFAULT_SCALE: f64 = 1.0e7;

    pub fn resistor(ohms: f64) -> Self {
        Self {
            resistance: ohms,
            capacitance: None,
            scale: Self::DEFAULT_SCALE,
        }
    }

    pub fn series_rc(ohms: f64, farads: f64) -> Self {
        Self {
            resistance: ohms,
            capacitance: Some(farads),
            scale: Self::DEFAULT_SCALE,
        }
    }

    /// Raw (real, imag) reading at `frequency_hz`, proportional to the load admittance.
    pub fn raw_at(&self, frequency_hz: f64) -> (f64, f64) {
        // Z = R - jXc, so 1/Z = (R + jXc) / (R^2 + Xc^2)
        let xc = match self.capacitance {
            Some(c) if frequency_hz > 0.0 => 1.0 / (TAU * frequency_hz * c),
            _ => 0.0,
        };
        let denom = self.resistance * self.resistance + xc * xc;
        if denom == 0.0 {
            return (0.0, 0.0);
        }
        (
            self.scale * self.resistance / denom,
            self.scale * xc / denom,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SweepState {
    Idle,
    Initialized,
    Running { step: u32 },
}

/// Offline stand-in for the instrument. Speaks the same line protocol and
/// refuses commands issued out of order.
pub struct SimulatedAnalyzer {
    load: SimulatedLoad,
    start_frequency: u32,
    frequency_increment: u32,
    num_points: u32,
    state: SweepState,
    pending: VecDeque<String>,
    received: Vec<Command>,
}

impl SimulatedAnalyzer {
    pub fn new(load: SimulatedLoad) -> Self {
        Self {
            load,
            start_frequency: 0,
            frequency_increment: 0,
            num_points: 0,
            state: SweepState::Idle,
            pending: VecDeque::new(),
            received: Vec::new(),
        }
    }

    /// Swaps the load, e.g. from the reference resistor to the device under test.
    pub fn set_load(&mut self, load: SimulatedLoad) {
        self.load = load;
    }

    /// Commands accepted so far, in arrival order.
    pub fn received(&self) -> &[Command] {
        &self.received
    }

    pub fn current_frequency(&self) -> Option<f64> {
        match self.state {
            SweepState::Running { step } => Some(
                self.start_frequency as f64 + step as f64 * self.frequency_increment as f64,
            ),
            _ => None,
        }
    }

    fn apply(&mut self, cmd: Command) -> io::Result<()> {
        match cmd {
            Command::SetStartFreq(hz) => self.start_frequency = hz,
            Command::SetFreqIncr(hz) => self.frequency_increment = hz,
            Command::SetNumPoints(n) => self.num_points = n,
            Command::Init => self.state = SweepState::Initialized,
            Command::Start => {
                if self.state != SweepState::Initialized {
                    return Err(out_of_order("IA.SWEEP.START! before IA.SWEEP.INIT!"));
                }
                self.state = SweepState::Running { step: 0 };
            }
            Command::MeasureRaw => {
                let frequency = self
                    .current_frequency()
                    .ok_or_else(|| out_of_order("measurement requested outside a sweep"))?;
                let (re, im) = self.load.raw_at(frequency);
                self.pending.push_back(format!("{frequency},{re},{im}"));
            }
            Command::IncrFreq => match self.state {
                SweepState::Running { step } if step + 1 < self.num_points => {
                    self.state = SweepState::Running { step: step + 1 };
                }
                SweepState::Running { .. } => {
                    return Err(out_of_order("frequency increment past the last point"));
                }
                _ => return Err(out_of_order("frequency increment outside a sweep")),
            },
        }
        Ok(())
    }
}

fn out_of_order(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg.to_owned())
}

impl CommandChannel for SimulatedAnalyzer {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        trace!("sim <- {line}");
        let cmd = Command::parse(line).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unknown command {line:?}"))
        })?;
        self.apply(cmd)?;
        self.received.push(cmd);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<String> {
        let line = self
            .pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "instrument did not answer"))?;
        trace!("sim -> {line}");
        Ok(line)
    }
}

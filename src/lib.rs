// src/lib.rs
//! Frequency sweeps and gain/phase calibration for AD5933-class impedance
//! analyzers driven over a line-oriented serial protocol.
//!
//! The caller supplies an open [`CommandChannel`]; [`SweepController`] walks the
//! instrument through the sweep one point at a time and [`calibrate`] turns the
//! raw readings into gain and phase tables.
pub mod config;
pub mod drivers;
pub mod types;

pub use config::{AppConfig, ChannelSettings};
pub use drivers::{
    calibrate, measure_gain_phase, run_sweep, CommandChannel, SweepController, SweepError,
};
pub use types::{ImpedancePoint, RawPoint, SweepConfig, SweepResult};

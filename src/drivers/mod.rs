// src/drivers/mod.rs
pub mod calibration;
pub mod channel;
pub mod command;
pub mod error;
pub mod sim;
pub mod sweep;
// re-export the types callers need
pub use calibration::calibrate;
pub use channel::{open_serial, CommandChannel, ScriptedChannel, SerialChannel, StreamChannel};
pub use command::{parse_measurement, Command};
pub use error::{SweepError, SweepStep};
pub use sim::{SimulatedAnalyzer, SimulatedLoad};
pub use sweep::{configuration_commands, measure_gain_phase, run_sweep, SweepController};

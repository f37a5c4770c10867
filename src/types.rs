// src/types.rs
use serde::{Deserialize, Serialize};

use crate::drivers::SweepError;

/// Parameters of one frequency sweep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub start_frequency: u32,     // Hz
    pub frequency_increment: u32, // Hz
    pub num_points: u32,
    pub reference_resistance: f64, // ohms
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_frequency: 1000,
            frequency_increment: 10_000,
            num_points: 100,
            reference_resistance: 1000.0,
        }
    }
}

impl SweepConfig {
    pub fn new(
        start_frequency: u32,
        frequency_increment: u32,
        num_points: u32,
        reference_resistance: f64,
    ) -> Self {
        Self {
            start_frequency,
            frequency_increment,
            num_points,
            reference_resistance,
        }
    }

    /// Rejects parameters the instrument cannot sweep with.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.start_frequency == 0 {
            return Err(SweepError::invalid_input(
                "start_frequency",
                "must be greater than zero",
            ));
        }
        if self.frequency_increment == 0 {
            return Err(SweepError::invalid_input(
                "frequency_increment",
                "must be greater than zero",
            ));
        }
        if self.num_points == 0 {
            return Err(SweepError::invalid_input(
                "num_points",
                "must be greater than zero",
            ));
        }
        validate_reference_resistance(self.reference_resistance)
    }

    /// Nominal frequency of step `index`. The instrument reports its own value.
    pub fn nominal_frequency(&self, index: u32) -> f64 {
        self.start_frequency as f64 + index as f64 * self.frequency_increment as f64
    }
}

pub(crate) fn validate_reference_resistance(ohms: f64) -> Result<(), SweepError> {
    if !ohms.is_finite() || ohms <= 0.0 {
        return Err(SweepError::invalid_input(
            "reference_resistance",
            format!("must be a positive finite value, got {ohms}"),
        ));
    }
    Ok(())
}

/// One raw reading as reported by the instrument.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub frequency: f64,
    pub real_component: f64,
    pub imag_component: f64,
}

impl RawPoint {
    pub fn new(frequency: f64, real_component: f64, imag_component: f64) -> Self {
        Self {
            frequency,
            real_component,
            imag_component,
        }
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.real_component * self.real_component + self.imag_component * self.imag_component
    }
}

/// Calibrated gain and phase curves of one sweep. All vectors share one length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub frequencies: Vec<f64>,
    pub gain: Vec<f64>,
    pub phase: Vec<f64>, // radians, (-pi, pi]
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Impedance of the load at one frequency, derived from a calibrated sweep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpedancePoint {
    pub frequency: f64,
    pub magnitude: f64, // ohms
    pub phase: f64,     // radians, (-pi, pi]
}

// src/drivers/calibration.rs
//! Gain factor calibration against a known reference resistor.
//!
//! For every point with raw components `R`, `I` and reference `Rref`:
//! - gain  = (1 / Rref) / sqrt(R^2 + I^2)
//! - phase = atan2(I, R), the system phase in (-pi, pi]
//!
//! The raw reading is proportional to the load admittance, so a later sweep
//! over an unknown load converts to impedance with the same tables:
//! `|Z| = 1 / (gain * sqrt(R^2 + I^2))`, `phase_z = phase - atan2(I, R)`.
use std::f64::consts::{PI, TAU};

use ndarray::{Array1, Zip};

use crate::drivers::SweepError;
use crate::types::{validate_reference_resistance, ImpedancePoint, RawPoint, SweepResult};

/// Converts raw readings taken against `reference_resistance` into gain and phase tables.
pub fn calibrate(points: &[RawPoint], reference_resistance: f64) -> Result<SweepResult, SweepError> {
    validate_reference_resistance(reference_resistance)?;
    if points.is_empty() {
        return Err(SweepError::invalid_input(
            "points",
            "at least one raw point is required",
        ));
    }
    let magnitude_sq = checked_magnitude_sq(points)?;
    let (re, im) = components(points);
    let gain = magnitude_sq.mapv(|m| (1.0 / reference_resistance) / m.sqrt());
    let phase = Zip::from(&re).and(&im).map_collect(|&r, &i| raw_phase(r, i));
    Ok(SweepResult {
        frequencies: points.iter().map(|p| p.frequency).collect(),
        gain: gain.to_vec(),
        phase: phase.to_vec(),
    })
}

impl SweepResult {
    /// Impedance of the load measured by `points`, a sweep over the same
    /// frequencies as this calibration.
    pub fn impedance(&self, points: &[RawPoint]) -> Result<Vec<ImpedancePoint>, SweepError> {
        if points.len() != self.len() {
            return Err(SweepError::invalid_input(
                "points",
                format!(
                    "calibration has {} points, measurement has {}",
                    self.len(),
                    points.len()
                ),
            ));
        }
        if let Some((index, (p, f))) = points
            .iter()
            .zip(&self.frequencies)
            .enumerate()
            .find(|(_, (p, f))| !same_frequency(p.frequency, **f))
        {
            return Err(SweepError::invalid_input(
                "points",
                format!(
                    "point {index} at {} Hz does not match calibration frequency {f} Hz",
                    p.frequency
                ),
            ));
        }
        let magnitude_sq = checked_magnitude_sq(points)?;
        Ok(points
            .iter()
            .zip(magnitude_sq.iter())
            .enumerate()
            .map(|(i, (p, &m))| ImpedancePoint {
                frequency: p.frequency,
                magnitude: 1.0 / (self.gain[i] * m.sqrt()),
                phase: wrap_phase(self.phase[i] - raw_phase(p.real_component, p.imag_component)),
            })
            .collect())
    }
}

fn components(points: &[RawPoint]) -> (Array1<f64>, Array1<f64>) {
    let re = points.iter().map(|p| p.real_component).collect();
    let im = points.iter().map(|p| p.imag_component).collect();
    (re, im)
}

fn checked_magnitude_sq(points: &[RawPoint]) -> Result<Array1<f64>, SweepError> {
    let magnitude_sq: Array1<f64> = points.iter().map(RawPoint::magnitude_squared).collect();
    match magnitude_sq.iter().position(|&m| m == 0.0) {
        Some(index) => Err(SweepError::Numeric { index }),
        None => Ok(magnitude_sq),
    }
}

fn raw_phase(r: f64, i: f64) -> f64 {
    // -0.0 + 0.0 is +0.0, keeping atan2 off -pi for a negative-zero imaginary part.
    (i + 0.0).atan2(r)
}

fn wrap_phase(phase: f64) -> f64 {
    if phase <= -PI {
        phase + TAU
    } else if phase > PI {
        phase - TAU
    } else {
        phase
    }
}

fn same_frequency(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn scenario_points() -> Vec<RawPoint> {
        vec![
            RawPoint::new(1000.0, 1.0, 0.0),
            RawPoint::new(11000.0, 0.0, 1.0),
            RawPoint::new(21000.0, -1.0, 0.0),
        ]
    }

    #[test]
    fn unit_readings_against_one_kilohm() {
        let result = calibrate(&scenario_points(), 1000.0).unwrap();
        assert_eq!(result.frequencies, vec![1000.0, 11000.0, 21000.0]);
        for g in &result.gain {
            assert!((g - 0.001).abs() < 1e-15);
        }
        assert_eq!(result.phase[0], 0.0);
        assert!((result.phase[1] - FRAC_PI_2).abs() < 1e-12);
        assert!((result.phase[2] - PI).abs() < 1e-12);
    }

    #[test]
    fn matches_per_point_formulas() {
        let points = vec![
            RawPoint::new(5000.0, -1523.0, 877.0),
            RawPoint::new(15000.0, 312.0, -4410.0),
            RawPoint::new(25000.0, -9.5, -0.25),
            RawPoint::new(35000.0, 1e-3, 2e-3),
        ];
        let rref = 220.0;
        let result = calibrate(&points, rref).unwrap();
        assert_eq!(result.len(), points.len());
        assert_eq!(result.gain.len(), points.len());
        assert_eq!(result.phase.len(), points.len());
        for (i, p) in points.iter().enumerate() {
            let (r, im) = (p.real_component, p.imag_component);
            assert_eq!(result.phase[i], im.atan2(r));
            let expected = (1.0 / rref) / (r * r + im * im).sqrt();
            assert!(((result.gain[i] - expected) / expected).abs() < 1e-12);
            assert_eq!(result.frequencies[i], p.frequency);
        }
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let points = vec![
            RawPoint::new(1000.0, 3.0, 4.0),
            RawPoint::new(2000.0, -7.25, 0.5),
        ];
        let a = calibrate(&points, 47.0).unwrap();
        let b = calibrate(&points, 47.0).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a.gain), bits(&b.gain));
        assert_eq!(bits(&a.phase), bits(&b.phase));
        assert_eq!(bits(&a.frequencies), bits(&b.frequencies));
    }

    #[test]
    fn zero_magnitude_is_a_numeric_error() {
        let points = vec![RawPoint::new(1000.0, 0.0, 0.0)];
        assert!(matches!(
            calibrate(&points, 1000.0),
            Err(SweepError::Numeric { index: 0 })
        ));
        let mut points = scenario_points();
        points[2] = RawPoint::new(21000.0, -0.0, 0.0);
        assert!(matches!(
            calibrate(&points, 1000.0),
            Err(SweepError::Numeric { index: 2 })
        ));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            calibrate(&[], 1000.0),
            Err(SweepError::InvalidInput { parameter: "points", .. })
        ));
        for rref in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                calibrate(&scenario_points(), rref),
                Err(SweepError::InvalidInput {
                    parameter: "reference_resistance",
                    ..
                })
            ));
        }
    }

    #[test]
    fn negative_zero_imaginary_stays_at_plus_pi() {
        let result = calibrate(&[RawPoint::new(1000.0, -2.0, -0.0)], 10.0).unwrap();
        assert_eq!(result.phase[0], PI);
    }

    #[test]
    fn reference_reading_maps_back_to_reference_resistance() {
        let points = vec![
            RawPoint::new(1000.0, 812.0, -143.0),
            RawPoint::new(11000.0, 790.0, -260.0),
        ];
        let cal = calibrate(&points, 1000.0).unwrap();
        let z = cal.impedance(&points).unwrap();
        for p in &z {
            assert!((p.magnitude - 1000.0).abs() < 1e-9);
            assert!(p.phase.abs() < 1e-12);
        }
    }

    #[test]
    fn impedance_scales_inversely_with_raw_magnitude() {
        let cal = calibrate(&[RawPoint::new(1000.0, 0.0, -1.0)], 1000.0).unwrap();
        let z = cal.impedance(&[RawPoint::new(1000.0, 0.0, 0.5)]).unwrap();
        assert!((z[0].magnitude - 2000.0).abs() < 1e-9);
        // -pi/2 - pi/2 wraps onto +pi
        assert!((z[0].phase - PI).abs() < 1e-12);
    }

    #[test]
    fn impedance_requires_matching_sweep() {
        let cal = calibrate(&scenario_points(), 1000.0).unwrap();
        let short = &scenario_points()[..2];
        assert!(matches!(
            cal.impedance(short),
            Err(SweepError::InvalidInput { .. })
        ));
        let mut shifted = scenario_points();
        shifted[1].frequency = 12000.0;
        assert!(matches!(
            cal.impedance(&shifted),
            Err(SweepError::InvalidInput { .. })
        ));
        let mut dead = scenario_points();
        dead[1] = RawPoint::new(11000.0, 0.0, 0.0);
        assert!(matches!(
            cal.impedance(&dead),
            Err(SweepError::Numeric { index: 1 })
        ));
    }
}

// src/drivers/command.rs
//! Text protocol of the impedance analyzer firmware.
//!
//! Every outbound command is one ASCII line terminated by a single `\n`.
//! The only inbound line is the answer to `IA.SWEEP.MEAS_RAW?`, which carries
//! `<frequency>,<real>,<imag>` as decimal numbers.
use std::fmt;

use crate::drivers::SweepError;
use crate::types::RawPoint;

/// Outbound commands understood by the instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    SetStartFreq(u32),
    SetFreqIncr(u32),
    SetNumPoints(u32),
    Init,
    Start,
    MeasureRaw,
    IncrFreq,
}

impl Command {
    /// Wire text of the command, without the line terminator.
    pub fn render(&self) -> String {
        match self {
            Command::SetStartFreq(hz) => format!("IA.START_FREQ {hz}"),
            Command::SetFreqIncr(hz) => format!("IA.FREQ_INCR {hz}"),
            Command::SetNumPoints(n) => format!("IA.NUM_INCR {n}"),
            Command::Init => "IA.SWEEP.INIT!".to_owned(),
            Command::Start => "IA.SWEEP.START!".to_owned(),
            Command::MeasureRaw => "IA.SWEEP.MEAS_RAW?".to_owned(),
            Command::IncrFreq => "IA.SWEEP.INCR_FREQ!".to_owned(),
        }
    }

    /// Inverse of [`Command::render`]; `None` for anything the firmware would not accept.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let arg = |prefix: &str| -> Option<u32> {
            line.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(' '))
                .and_then(|v| v.trim().parse().ok())
        };
        match line {
            "IA.SWEEP.INIT!" => Some(Command::Init),
            "IA.SWEEP.START!" => Some(Command::Start),
            "IA.SWEEP.MEAS_RAW?" => Some(Command::MeasureRaw),
            "IA.SWEEP.INCR_FREQ!" => Some(Command::IncrFreq),
            _ => arg("IA.START_FREQ")
                .map(Command::SetStartFreq)
                .or_else(|| arg("IA.FREQ_INCR").map(Command::SetFreqIncr))
                .or_else(|| arg("IA.NUM_INCR").map(Command::SetNumPoints)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Decodes a measurement response for point `index`.
///
/// Exactly three comma separated finite decimals are accepted; surrounding
/// whitespace and the line terminator are ignored.
pub fn parse_measurement(index: usize, line: &str) -> Result<RawPoint, SweepError> {
    let malformed = |reason: String| SweepError::Protocol {
        index,
        raw: line.to_owned(),
        reason,
    };
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(malformed(format!("expected 3 fields, got {}", fields.len())));
    }
    let mut values = [0.0f64; 3];
    for (slot, field) in values.iter_mut().zip(&fields) {
        let value: f64 = field
            .parse()
            .map_err(|_| malformed(format!("field {field:?} is not a number")))?;
        if !value.is_finite() {
            return Err(malformed(format!("field {field:?} is not finite")));
        }
        *slot = value;
    }
    Ok(RawPoint::new(values[0], values[1], values[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_wire_text() {
        assert_eq!(Command::SetStartFreq(1000).render(), "IA.START_FREQ 1000");
        assert_eq!(Command::SetFreqIncr(10_000).render(), "IA.FREQ_INCR 10000");
        assert_eq!(Command::SetNumPoints(100).render(), "IA.NUM_INCR 100");
        assert_eq!(Command::Init.render(), "IA.SWEEP.INIT!");
        assert_eq!(Command::Start.render(), "IA.SWEEP.START!");
        assert_eq!(Command::MeasureRaw.render(), "IA.SWEEP.MEAS_RAW?");
        assert_eq!(Command::IncrFreq.render(), "IA.SWEEP.INCR_FREQ!");
    }

    #[test]
    fn parse_accepts_rendered_commands() {
        assert_eq!(
            Command::parse("IA.NUM_INCR 42\n"),
            Some(Command::SetNumPoints(42))
        );
        assert_eq!(Command::parse("IA.SWEEP.START!"), Some(Command::Start));
        assert_eq!(Command::parse("IA.START_FREQ"), None);
        assert_eq!(Command::parse("IA.START_FREQ abc"), None);
        assert_eq!(Command::parse("*IDN?"), None);
    }

    #[test]
    fn parses_measurement_triples() {
        let p = parse_measurement(0, "11000,0.0,1.0\r\n").unwrap();
        assert_eq!(p, RawPoint::new(11000.0, 0.0, 1.0));
        let p = parse_measurement(1, " 1000 , -12.5 , 3e2 ").unwrap();
        assert_eq!(p, RawPoint::new(1000.0, -12.5, 300.0));
    }

    #[test]
    fn rejects_wrong_field_count() {
        match parse_measurement(3, "1000,0.5") {
            Err(SweepError::Protocol { index, raw, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(raw, "1000,0.5");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_measurement(0, "1,2,3,4").is_err());
        assert!(parse_measurement(0, "").is_err());
    }

    #[test]
    fn rejects_non_numeric_and_non_finite_fields() {
        assert!(parse_measurement(0, "1000,abc,1").is_err());
        assert!(parse_measurement(0, "1000,nan,1").is_err());
        assert!(parse_measurement(0, "1000,1,inf").is_err());
        assert!(parse_measurement(0, "1000,,1").is_err());
    }
}

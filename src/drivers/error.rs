// src/drivers/error.rs
use std::fmt;
use std::io;

use thiserror::Error;

use crate::drivers::command::Command;

/// Position in the sweep protocol where a channel operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepStep {
    /// Sending one of the configuration commands.
    Configure(Command),
    /// Requesting or reading the measurement of point `index`.
    Measure { index: usize },
    /// Advancing the instrument after point `index`.
    Advance { index: usize },
}

impl fmt::Display for SweepStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepStep::Configure(cmd) => write!(f, "configuring ({})", cmd.render()),
            SweepStep::Measure { index } => write!(f, "measuring point {index}"),
            SweepStep::Advance { index } => write!(f, "advancing past point {index}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("channel failure while {step}: {source}")]
    Channel {
        step: SweepStep,
        #[source]
        source: io::Error,
    },
    #[error("malformed response for point {index}: {reason} (raw: {raw:?})")]
    Protocol {
        index: usize,
        raw: String,
        reason: String,
    },
    #[error("zero-magnitude reading at point {index}; gain is undefined")]
    Numeric { index: usize },
    #[error("invalid {parameter}: {reason}")]
    InvalidInput {
        parameter: &'static str,
        reason: String,
    },
}

impl SweepError {
    pub(crate) fn channel(step: SweepStep, source: io::Error) -> Self {
        SweepError::Channel { step, source }
    }

    pub(crate) fn invalid_input(parameter: &'static str, reason: impl Into<String>) -> Self {
        SweepError::InvalidInput {
            parameter,
            reason: reason.into(),
        }
    }

    /// True when the instrument stopped answering within the read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SweepError::Channel { source, .. }
                if matches!(source.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        )
    }

    /// Point index the failure refers to, if any.
    pub fn point_index(&self) -> Option<usize> {
        match self {
            SweepError::Channel {
                step: SweepStep::Measure { index } | SweepStep::Advance { index },
                ..
            }
            | SweepError::Protocol { index, .. }
            | SweepError::Numeric { index } => Some(*index),
            _ => None,
        }
    }
}

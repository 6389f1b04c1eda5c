//! Error types for the simulation core
//!
//! Every failure is terminal for the current run: the stepper halts and the
//! host decides whether to restart.

use thiserror::Error;

/// Failures surfaced by the grid, kernels, stepper and pattern generators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifeError {
    /// Kernel failed to compile/link, or device/buffer allocation failed
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Runtime failure while computing a generation
    #[error("step failed: {0}")]
    Step(String),

    /// Malformed generator parameters, detected before any cell is written
    #[error("invalid generator input: {0}")]
    GeneratorInput(String),

    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

impl LifeError {
    pub(crate) fn generator(message: impl Into<String>) -> Self {
        LifeError::GeneratorInput(message.into())
    }
}

pub type LifeResult<T> = Result<T, LifeError>;

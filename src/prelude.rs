//! # Prelude
//!
//! Commonly used types for driving the simulation headless or embedding it.
//!
//! ```no_run
//! use torus_life::prelude::*;
//!
//! fn main() -> LifeResult<()> {
//!     let mut stepper = SimulationStepper::new(64, 64, cpu_factory())?.with_seed(7);
//!     stepper.initialize()?;
//!     stepper.generate(&RandomFill::default())?;
//!     stepper.step()?;
//!     println!("{} cells alive", stepper.current().alive_count());
//!     Ok(())
//! }
//! ```

pub use crate::app::LifeApp;
pub use crate::command::Command;
pub use crate::config::{Backend, LifeConfig};
pub use crate::error::{LifeError, LifeResult};
pub use crate::grid::{GridBuffer, GridState};
pub use crate::input::InputInjector;

pub use crate::patterns::{
    affine::IteratedAffineSystem,
    chaos_game::ChaosGame,
    escape_time::EscapeTime,
    lsystem::LSystem,
    presets::{Preset, StaticPresetPlacer},
    random_fill::RandomFill,
    subdivision::KochCurve,
    GeneratorKind, Pattern, PatternGenerator, PatternTask,
};

pub use crate::simulation::{
    cpu_factory, CpuKernel, GpuKernel, KernelFactory, SimulationStepper, Status, StepStats,
    TransitionKernel,
};

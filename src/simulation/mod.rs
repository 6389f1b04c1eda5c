//! Simulation core
//!
//! [`kernel`] defines the transition rule and its CPU reference, [`gpu`] runs
//! the same rule as a wgpu compute shader, and [`stepper`] drives generations
//! over the double-buffered grid.

pub mod gpu;
pub mod kernel;
pub mod stats;
pub mod stepper;

pub use gpu::GpuKernel;
pub use kernel::{CpuKernel, TransitionKernel};
pub use stats::StepStats;
pub use stepper::{cpu_factory, KernelFactory, SimulationStepper, Status};

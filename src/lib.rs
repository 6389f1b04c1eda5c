// src/lib.rs
//! Torus Life
//!
//! Conway's Game of Life on a wrap-around grid. Generations are computed by a
//! wgpu compute kernel (or a CPU reference kernel), seeded by procedural
//! pattern generators and edited live with the pointer.

pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod gfx;
pub mod grid;
pub mod input;
pub mod patterns;
pub mod prelude;
pub mod simulation;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::LifeApp;
pub use config::LifeConfig;
pub use error::{LifeError, LifeResult};

/// Creates an application with configuration read from the environment
pub fn default() -> anyhow::Result<LifeApp> {
    LifeApp::new(LifeConfig::from_env()?)
}

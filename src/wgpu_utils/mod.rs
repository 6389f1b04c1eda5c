// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! Binding type shorthands plus typed buffer wrappers shared by the compute
//! kernel and the display pipeline.

pub mod binding_types;
pub mod uniform_buffer;

pub use binding_types::*;
pub use uniform_buffer::{ArrayBuffer, UniformBuffer};

//! Grid data model
//!
//! Two alternating buffers of single-channel cell intensities on a torus.

pub mod state;

pub use state::{intensity, is_alive, GridBuffer, GridState, ALIVE, DEAD, THRESHOLD};

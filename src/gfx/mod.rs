//! # Graphics Module
//!
//! Presentation of the simulation: the [`RenderEngine`] owns the surface and
//! draws the current generation as a full-screen texture, and the
//! [`UiManager`] overlays the imgui status panel on top.
//!
//! Compute work shares the render engine's device through
//! [`RenderEngine::device_handle`] and [`RenderEngine::queue_handle`].

pub mod render_engine;
pub mod texture_resource;
pub mod ui;

pub use render_engine::{DisplayParams, RenderEngine};
pub use texture_resource::TextureResource;
pub use ui::{InputCapture, UiManager};

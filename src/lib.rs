// src/lib.rs
//! Goalmouth
//!
//! An interactive 3D goal scene built on wgpu and winit: a procedural goal
//! frame, an imported ball model, and two frame-driven ball animations (a
//! bounce loop and a one-shot scoring trajectory).
//!
//! The engine core ([`world`], [`animation`], [`gfx`]) emits a fixed
//! immediate-mode command vocabulary against the
//! [`RenderBackend`](gfx::RenderBackend) boundary; the wgpu executor and
//! the winit/imgui host surface live behind it.

pub mod animation;
pub mod app;
pub mod error;
pub mod gfx;
pub mod ui;
pub mod world;

// Re-export main types for convenience
pub use app::GoalmouthApp;
pub use error::{AssetLoadError, InitializationError};
pub use world::{World, WorldConfig};

/// Creates an application over the conventional `assets/` layout.
pub fn default() -> GoalmouthApp {
    GoalmouthApp::new(WorldConfig::from_assets_dir("assets"))
}

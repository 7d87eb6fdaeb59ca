//! # Graphics Module
//!
//! Everything between the world orchestrator and the GPU:
//!
//! - **Backend boundary** ([`backend`]) - the fixed immediate-mode command
//!   vocabulary the core emits
//! - **Command trace** ([`trace`]) - a recording backend for tests and
//!   frame debugging
//! - **Procedural geometry** ([`geometry`]) - the goal frame cylinders
//! - **Texture binding** ([`texture`]) - per-draw decode/flip/upload
//! - **Scene asset** ([`asset`]) - lifecycle proxy over the imported model
//! - **Renderer** ([`renderer`]) - wgpu executor for the command stream

pub mod asset;
pub mod backend;
pub mod geometry;
pub mod renderer;
pub mod texture;
pub mod trace;

pub use backend::RenderBackend;
pub use renderer::WgpuRenderer;

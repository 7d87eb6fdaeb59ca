//! # User Interface Module
//!
//! Dear ImGui-based UI: the [`UiManager`] handles ImGui integration with
//! winit and wgpu, the [`ControlPanel`] holds the dropdown selections and
//! the replacement-model field, and paints the corner text overlay emitted
//! by the world's draw sequence.

pub mod manager;
pub mod panel;

pub use manager::UiManager;
pub use panel::ControlPanel;

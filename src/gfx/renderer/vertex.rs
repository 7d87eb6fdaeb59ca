//! GPU vertex layout for the immediate-mode vertex stream
//!
//! The command-stream [`Vertex`](crate::gfx::backend::Vertex) is already a
//! `#[repr(C)]` POD, so it uploads as-is; this module only describes its
//! attribute layout to the pipeline.

use std::mem;

use crate::gfx::backend::Vertex;

/// Buffer layout: position (location 0), normal (location 1), uv
/// (location 2).
pub fn layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    }
}

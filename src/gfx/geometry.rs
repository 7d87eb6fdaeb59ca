//! # Procedural Geometry
//!
//! Quadric-style cylinder primitives for the goal frame. A cylinder draws
//! its lateral surface only (no caps) as an immediate-mode triangle list
//! against whatever transform, color, and texture state is current at render
//! time.

use std::f32::consts::PI;

use super::backend::{RenderBackend, Vertex};

/// A parameterized cylinder primitive.
///
/// The surface runs along +Z from `z = 0` to `z = height`, with the radius
/// interpolated linearly from `base_radius` to `top_radius`. Dimension
/// fields are public and re-read on every [`render`](Cylinder::render), so a
/// height change takes effect on the next frame without re-creating the
/// primitive.
pub struct Cylinder {
    pub base_radius: f32,
    pub top_radius: f32,
    pub height: f32,
    slices: u32,
    stacks: u32,
    /// Unit-circle table computed once per context; `None` until
    /// [`create_in_context`](Cylinder::create_in_context).
    circle: Option<Vec<[f32; 2]>>,
}

impl Cylinder {
    /// Creates a cylinder descriptor. Requires `slices >= 3` and
    /// `stacks >= 1`.
    pub fn new(base_radius: f32, top_radius: f32, height: f32, slices: u32, stacks: u32) -> Self {
        assert!(slices >= 3, "cylinder needs at least 3 slices");
        assert!(stacks >= 1, "cylinder needs at least 1 stack");
        Self {
            base_radius,
            top_radius,
            height,
            slices,
            stacks,
            circle: None,
        }
    }

    /// One-time creation against the rendering context.
    ///
    /// Must be called exactly once per primitive, after the context exists
    /// and before the first [`render`](Cylinder::render); a second call is a
    /// caller bug.
    pub fn create_in_context(&mut self, _backend: &mut dyn RenderBackend) {
        debug_assert!(
            self.circle.is_none(),
            "create_in_context() called twice on the same cylinder"
        );
        let slices = self.slices;
        let circle = (0..=slices)
            .map(|i| {
                let angle = i as f32 * 2.0 * PI / slices as f32;
                [angle.cos(), angle.sin()]
            })
            .collect();
        self.circle = Some(circle);
    }

    /// Draws the lateral surface against the current transform.
    ///
    /// May be called any number of times per frame. Uses the shading and
    /// texture state active at call time.
    pub fn render(&self, backend: &mut dyn RenderBackend) {
        let circle = self
            .circle
            .as_ref()
            .expect("create_in_context() must be called before render()");

        let vertices = self.tessellate(circle);
        backend.draw_triangles(&vertices);
    }

    /// Current slice count.
    pub fn slices(&self) -> u32 {
        self.slices
    }

    /// Current stack count.
    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    fn tessellate(&self, circle: &[[f32; 2]]) -> Vec<Vertex> {
        let mut vertices = Vec::with_capacity((self.slices * self.stacks * 6) as usize);

        // Lateral normal in the (radial, z) plane, constant along the side.
        let dr = self.base_radius - self.top_radius;
        let len = (self.height * self.height + dr * dr).sqrt();
        let (nr, nz) = if len > 0.0 {
            (self.height / len, dr / len)
        } else {
            (1.0, 0.0)
        };

        let ring = |stack: u32, slice: u32| {
            let t = stack as f32 / self.stacks as f32;
            let radius = self.base_radius + (self.top_radius - self.base_radius) * t;
            let [cos_a, sin_a] = circle[slice as usize];
            Vertex::new(
                [radius * cos_a, radius * sin_a, self.height * t],
                [cos_a * nr, sin_a * nr, nz],
                [slice as f32 / self.slices as f32, t],
            )
        };

        // Counter-clockwise from outside, so the lateral surface survives
        // back-face culling.
        for stack in 0..self.stacks {
            for slice in 0..self.slices {
                let bl = ring(stack, slice);
                let br = ring(stack, slice + 1);
                let tl = ring(stack + 1, slice);
                let tr = ring(stack + 1, slice + 1);

                vertices.extend_from_slice(&[bl, tl, br, br, tl, tr]);
            }
        }

        vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::trace::{Command, TraceBackend};

    fn created(base: f32, top: f32, height: f32, slices: u32, stacks: u32) -> Cylinder {
        let mut cylinder = Cylinder::new(base, top, height, slices, stacks);
        let mut trace = TraceBackend::new();
        cylinder.create_in_context(&mut trace);
        cylinder
    }

    #[test]
    fn lateral_surface_has_no_caps() {
        let cylinder = created(0.1, 0.1, 3.0, 8, 2);
        let vertices = cylinder.tessellate(cylinder.circle.as_ref().unwrap());

        // slices * stacks quads, two triangles each, and nothing else.
        assert_eq!(vertices.len(), 8 * 2 * 6);
        // No cap geometry: every normal is radial for equal radii.
        for v in &vertices {
            assert!(v.normal[2].abs() < 1e-6);
            let r = (v.normal[0] * v.normal[0] + v.normal[1] * v.normal[1]).sqrt();
            assert!((r - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn height_is_reread_on_every_render() {
        let mut cylinder = created(0.1, 0.1, 3.0, 4, 1);
        cylinder.height = 6.0;
        let vertices = cylinder.tessellate(cylinder.circle.as_ref().unwrap());
        let max_z = vertices.iter().map(|v| v.position[2]).fold(0.0, f32::max);
        assert_eq!(max_z, 6.0);
    }

    #[test]
    fn render_emits_one_triangle_list() {
        let cylinder = created(0.1, 0.1, 1.0, 4, 1);
        let mut trace = TraceBackend::new();
        cylinder.render(&mut trace);
        assert_eq!(
            trace.commands,
            vec![Command::DrawTriangles { vertex_count: 24 }]
        );
    }

    #[test]
    #[should_panic(expected = "create_in_context")]
    fn render_before_creation_is_a_bug() {
        let cylinder = Cylinder::new(0.1, 0.1, 1.0, 4, 1);
        let mut trace = TraceBackend::new();
        cylinder.render(&mut trace);
    }

    #[test]
    #[should_panic(expected = "slices")]
    fn too_few_slices_is_rejected() {
        Cylinder::new(0.1, 0.1, 1.0, 2, 1);
    }
}

//! Immediate-mode rendering backend boundary
//!
//! The engine core never talks to a GPU API directly. It emits a fixed
//! vocabulary of immediate-mode commands (clear, matrix push/pop, transform
//! mutations, texture upload/bind state, primitive draws, lights, overlay
//! text, flush) against the [`RenderBackend`] trait. The wgpu executor in
//! [`crate::gfx::renderer`] implements the trait for the screen; the
//! [`crate::gfx::trace::TraceBackend`] implements it as a command recorder.

/// A single vertex of an immediate-mode triangle list.
///
/// Drawn against the transform, color, and texture state current at the time
/// of the `draw_triangles` call.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// How a bound texture combines with the underlying surface color.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureEnvMode {
    /// Texture color multiplies the lit vertex color.
    Modulate,
    /// Texture color is added on top of the lit vertex color.
    Add,
}

/// Minification/magnification filtering for an uploaded texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Addressing mode outside the [0, 1] coordinate range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    Clamp,
}

/// Sampling configuration applied at upload time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureSampling {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

/// A decoded RGBA8 image, top-left origin, ready for upload.
#[derive(Clone, Debug)]
pub struct TexturePixels<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

/// A light source in scene coordinates.
///
/// `spot` narrows the light to a cone; `None` leaves it omnidirectional.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub position: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub spot: Option<SpotParams>,
}

/// Cone parameters for a spot light.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpotParams {
    pub direction: [f32; 3],
    pub cutoff_deg: f32,
}

/// One-time context configuration issued during world initialization.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextSettings {
    pub depth_test: bool,
    /// Back faces are culled; front faces wind counter-clockwise.
    pub cull_back_faces: bool,
    /// Ambient + diffuse material tracks the current color on both sides.
    pub two_sided_color_material: bool,
    /// Flat (per-face) shading instead of smooth interpolation.
    pub flat_shading: bool,
    pub clear_color: [f32; 4],
}

/// The fixed immediate-mode command vocabulary.
///
/// Transform mutations follow a strict stack discipline: every
/// `push_matrix` is balanced by a `pop_matrix` which undoes all mutations
/// applied since the push, however many there were. None of these
/// operations can fail under normal use; an executor-level failure (e.g.
/// losing the surface) is fatal to the frame.
pub trait RenderBackend {
    /// Clears the color and depth buffers.
    fn clear(&mut self);

    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn load_identity(&mut self);

    fn translate(&mut self, x: f32, y: f32, z: f32);
    /// Rotates about an arbitrary axis, angle in degrees.
    fn rotate(&mut self, angle_deg: f32, axis: [f32; 3]);
    fn scale(&mut self, x: f32, y: f32, z: f32);

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn set_perspective(&mut self, fovy_deg: f32, aspect: f32, near: f32, far: f32);

    fn configure(&mut self, settings: &ContextSettings);
    fn set_light(&mut self, index: usize, light: &Light);
    /// Sets the current vertex color used by subsequent draws.
    fn set_color(&mut self, r: f32, g: f32, b: f32);

    /// Uploads an image and makes it the bound texture for subsequent draws.
    fn upload_texture(&mut self, pixels: TexturePixels<'_>, sampling: TextureSampling);
    fn set_texture_env(&mut self, mode: TextureEnvMode);
    /// Enables sphere-map generation of S/T coordinates, replacing the
    /// per-vertex `uv` values of subsequent draws.
    fn set_sphere_mapping(&mut self, enabled: bool);

    /// Draws a triangle list against the current transform and bound state.
    fn draw_triangles(&mut self, vertices: &[Vertex]);

    /// Queues a line of overlay text at viewport-relative coordinates
    /// (origin bottom-left, like the raster position convention of the
    /// rest of the command stream).
    fn draw_text(&mut self, x: f32, y: f32, color: [f32; 3], text: &str);

    /// Ends the frame: everything emitted since `clear` is presented.
    fn flush(&mut self);
}

/// Scoped save/restore over the transform stack.
///
/// `scoped` brackets a closure between `push_matrix`/`pop_matrix` so the
/// brackets stay balanced no matter how many transform mutations the closure
/// applies.
pub trait TransformStackExt: RenderBackend {
    fn scoped<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.push_matrix();
        let out = body(&mut *self);
        self.pop_matrix();
        out
    }
}

impl<B: RenderBackend + ?Sized> TransformStackExt for B {}

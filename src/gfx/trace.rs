//! Command-stream recorder
//!
//! [`TraceBackend`] implements [`RenderBackend`] by recording every command
//! it receives. Useful for asserting on the exact per-frame draw sequence in
//! tests and for dumping a frame when debugging transform choreography.

use super::backend::{
    ContextSettings, Light, RenderBackend, TextureEnvMode, TexturePixels, TextureSampling, Vertex,
};

/// One recorded backend command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Clear,
    PushMatrix,
    PopMatrix,
    LoadIdentity,
    Translate([f32; 3]),
    Rotate { angle_deg: f32, axis: [f32; 3] },
    Scale([f32; 3]),
    Viewport([i32; 4]),
    Perspective {
        fovy_deg: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Configure(ContextSettings),
    SetLight(usize, Light),
    Color([f32; 3]),
    UploadTexture {
        width: u32,
        height: u32,
        sampling: TextureSampling,
        /// First pixel of the uploaded buffer, enough to assert orientation.
        top_left_rgba: [u8; 4],
    },
    TextureEnv(TextureEnvMode),
    SphereMapping(bool),
    DrawTriangles { vertex_count: usize },
    DrawText {
        x: f32,
        y: f32,
        color: [f32; 3],
        text: String,
    },
    Flush,
}

/// Records the emitted command stream for inspection.
#[derive(Default)]
pub struct TraceBackend {
    pub commands: Vec<Command>,
}

impl TraceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of texture uploads seen so far.
    pub fn upload_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::UploadTexture { .. }))
            .count()
    }

    /// Index of the first command matching `pred`, if any.
    pub fn position_of(&self, pred: impl Fn(&Command) -> bool) -> Option<usize> {
        self.commands.iter().position(pred)
    }
}

impl RenderBackend for TraceBackend {
    fn clear(&mut self) {
        self.commands.push(Command::Clear);
    }

    fn push_matrix(&mut self) {
        self.commands.push(Command::PushMatrix);
    }

    fn pop_matrix(&mut self) {
        self.commands.push(Command::PopMatrix);
    }

    fn load_identity(&mut self) {
        self.commands.push(Command::LoadIdentity);
    }

    fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.commands.push(Command::Translate([x, y, z]));
    }

    fn rotate(&mut self, angle_deg: f32, axis: [f32; 3]) {
        self.commands.push(Command::Rotate { angle_deg, axis });
    }

    fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.commands.push(Command::Scale([x, y, z]));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.commands.push(Command::Viewport([x, y, width, height]));
    }

    fn set_perspective(&mut self, fovy_deg: f32, aspect: f32, near: f32, far: f32) {
        self.commands.push(Command::Perspective {
            fovy_deg,
            aspect,
            near,
            far,
        });
    }

    fn configure(&mut self, settings: &ContextSettings) {
        self.commands.push(Command::Configure(settings.clone()));
    }

    fn set_light(&mut self, index: usize, light: &Light) {
        self.commands.push(Command::SetLight(index, light.clone()));
    }

    fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.commands.push(Command::Color([r, g, b]));
    }

    fn upload_texture(&mut self, pixels: TexturePixels<'_>, sampling: TextureSampling) {
        let mut top_left_rgba = [0u8; 4];
        if pixels.rgba.len() >= 4 {
            top_left_rgba.copy_from_slice(&pixels.rgba[..4]);
        }
        self.commands.push(Command::UploadTexture {
            width: pixels.width,
            height: pixels.height,
            sampling,
            top_left_rgba,
        });
    }

    fn set_texture_env(&mut self, mode: TextureEnvMode) {
        self.commands.push(Command::TextureEnv(mode));
    }

    fn set_sphere_mapping(&mut self, enabled: bool) {
        self.commands.push(Command::SphereMapping(enabled));
    }

    fn draw_triangles(&mut self, vertices: &[Vertex]) {
        self.commands.push(Command::DrawTriangles {
            vertex_count: vertices.len(),
        });
    }

    fn draw_text(&mut self, x: f32, y: f32, color: [f32; 3], text: &str) {
        self.commands.push(Command::DrawText {
            x,
            y,
            color,
            text: text.to_owned(),
        });
    }

    fn flush(&mut self) {
        self.commands.push(Command::Flush);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::TransformStackExt;

    #[test]
    fn scoped_brackets_are_balanced() {
        let mut trace = TraceBackend::new();
        trace.scoped(|b| {
            b.translate(1.0, 2.0, 3.0);
            b.scoped(|b| b.rotate(90.0, [0.0, 1.0, 0.0]));
        });

        assert_eq!(
            trace.commands,
            vec![
                Command::PushMatrix,
                Command::Translate([1.0, 2.0, 3.0]),
                Command::PushMatrix,
                Command::Rotate {
                    angle_deg: 90.0,
                    axis: [0.0, 1.0, 0.0]
                },
                Command::PopMatrix,
                Command::PopMatrix,
            ]
        );
    }
}

//! Per-draw texture binding
//!
//! Each surface that needs its own texture re-binds it from a file path
//! immediately before the geometry that uses it. The manager decodes the
//! image, flips it vertically (source images are stored bottom-to-top
//! relative to the executor's texture-space convention; skipping the flip
//! renders everything upside down), uploads it as RGBA8 with nearest
//! filtering and repeat wrap, and configures the combine mode and optional
//! sphere-map coordinate generation.
//!
//! There is no cache: a path bound every frame is decoded and uploaded from
//! scratch every frame, exactly as the source system did. See DESIGN.md for
//! the flagged optimization opportunity.

use std::path::Path;

use image::ImageError;

use super::backend::{
    RenderBackend, TextureEnvMode, TextureFilter, TexturePixels, TextureSampling, TextureWrap,
};
use crate::error::AssetLoadError;

/// How the texture participates in shading.
#[derive(Copy, Clone, Debug)]
pub struct TextureOptions {
    /// Modulate with the lit vertex color when true, add when false.
    pub modulate: bool,
    /// Generate S/T coordinates from the view-space normal (sphere map)
    /// instead of using per-vertex coordinates.
    pub sphere_map: bool,
}

/// Stateless binder: decode, flip, upload, configure.
pub struct TextureManager;

impl TextureManager {
    /// Binds the image at `path` for subsequent draws.
    ///
    /// On failure the previously bound texture stays active; no upload or
    /// state change is emitted.
    pub fn bind(
        backend: &mut dyn RenderBackend,
        path: &Path,
        options: TextureOptions,
    ) -> Result<(), AssetLoadError> {
        let decoded = image::open(path).map_err(|err| match err {
            ImageError::IoError(source) => AssetLoadError::Unreadable {
                path: path.to_owned(),
                source,
            },
            source => AssetLoadError::BadImage {
                path: path.to_owned(),
                source,
            },
        })?;

        // Source images are bottom-to-top; the flip is mandatory for
        // correct on-screen orientation.
        let rgba = decoded.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();

        backend.upload_texture(
            TexturePixels {
                width,
                height,
                rgba: rgba.as_raw(),
            },
            TextureSampling {
                filter: TextureFilter::Nearest,
                wrap: TextureWrap::Repeat,
            },
        );
        backend.set_texture_env(if options.modulate {
            TextureEnvMode::Modulate
        } else {
            TextureEnvMode::Add
        });
        backend.set_sphere_mapping(options.sphere_map);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::trace::{Command, TraceBackend};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_png(pixels: &[(u8, u8, u8, u8)], width: u32, height: u32) -> PathBuf {
        let mut img = image::RgbaImage::new(width, height);
        for (i, &(r, g, b, a)) in pixels.iter().enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            img.put_pixel(x, y, image::Rgba([r, g, b, a]));
        }
        let path = std::env::temp_dir().join(format!(
            "goalmouth-tex-{}-{}.png",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn bind_flips_uploads_and_configures() {
        // 1x2 image: red on top, blue on the bottom row.
        let path = temp_png(&[(255, 0, 0, 255), (0, 0, 255, 255)], 1, 2);
        let mut trace = TraceBackend::new();

        TextureManager::bind(
            &mut trace,
            &path,
            TextureOptions {
                modulate: true,
                sphere_map: false,
            },
        )
        .unwrap();

        assert_eq!(
            trace.commands,
            vec![
                Command::UploadTexture {
                    width: 1,
                    height: 2,
                    sampling: TextureSampling {
                        filter: TextureFilter::Nearest,
                        wrap: TextureWrap::Repeat,
                    },
                    // After the vertical flip the bottom (blue) row uploads
                    // first.
                    top_left_rgba: [0, 0, 255, 255],
                },
                Command::TextureEnv(TextureEnvMode::Modulate),
                Command::SphereMapping(false),
            ]
        );

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn additive_sphere_mapped_bind() {
        let path = temp_png(&[(10, 20, 30, 255)], 1, 1);
        let mut trace = TraceBackend::new();

        TextureManager::bind(
            &mut trace,
            &path,
            TextureOptions {
                modulate: false,
                sphere_map: true,
            },
        )
        .unwrap();

        assert!(trace
            .commands
            .contains(&Command::TextureEnv(TextureEnvMode::Add)));
        assert!(trace.commands.contains(&Command::SphereMapping(true)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unreadable_path_leaves_state_untouched() {
        let mut trace = TraceBackend::new();
        let result = TextureManager::bind(
            &mut trace,
            Path::new("/nonexistent/grass.png"),
            TextureOptions {
                modulate: true,
                sphere_map: false,
            },
        );

        assert!(matches!(result, Err(AssetLoadError::Unreadable { .. })));
        assert!(trace.commands.is_empty());
    }

    #[test]
    fn corrupt_file_is_a_bad_image() {
        let path = std::env::temp_dir().join(format!(
            "goalmouth-tex-corrupt-{}.png",
            std::process::id()
        ));
        std::fs::write(&path, b"not a png at all").unwrap();

        let mut trace = TraceBackend::new();
        let result = TextureManager::bind(
            &mut trace,
            &path,
            TextureOptions {
                modulate: true,
                sphere_map: false,
            },
        );

        assert!(matches!(result, Err(AssetLoadError::BadImage { .. })));
        assert!(trace.commands.is_empty());

        std::fs::remove_file(path).ok();
    }
}

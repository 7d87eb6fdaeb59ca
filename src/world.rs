//! World orchestration
//!
//! [`World`] owns the camera parameters, viewport size, goal geometry, the
//! imported scene asset, and the animation engine, and composes them into
//! one deterministic per-frame command sequence:
//!
//! clear -> camera transform -> grass-textured ground -> plastic-textured
//! goal frames -> animation advance -> ball-textured scene asset -> corner
//! text overlay -> flush.
//!
//! All mutable per-frame state lives in this one struct and is passed by
//! exclusive reference into `draw`, which makes the single-writer-per-frame
//! discipline explicit in the API.

use std::path::PathBuf;

use crate::animation::{AnimationEngine, SurfaceControl};
use crate::error::AssetLoadError;
use crate::gfx::asset::SceneAsset;
use crate::gfx::backend::{
    ContextSettings, Light, RenderBackend, SpotParams, TransformStackExt, Vertex,
};
use crate::gfx::geometry::Cylinder;
use crate::gfx::texture::{TextureManager, TextureOptions};

/// Goal height per UI selection index.
pub const GOAL_HEIGHTS: [f32; 4] = [3.0, 4.0, 5.0, 6.0];
/// Ball scale factor per UI selection index.
pub const BALL_SCALES: [f64; 4] = [1.0, 2.0, 4.0, 8.0];
/// Ball spin speed (degrees per frame) per UI selection index.
pub const BALL_SPIN_SPEEDS: [f64; 4] = [1.0, 3.0, 5.0, 10.0];

/// Camera tilt boundaries, stepped in 5 degree increments. The tilt ops
/// refuse to step exactly at the boundary value, so these are reachable and
/// final.
pub const TILT_MIN: f32 = -15.0;
pub const TILT_MAX: f32 = 70.0;
const TILT_STEP: f32 = 5.0;
const YAW_STEP: f32 = 5.0;
const ZOOM_STEP: f32 = 700.0;

const INITIAL_DISTANCE: f32 = 7000.0;
/// Fixed downward tilt applied under the user rotation.
const BASE_TILT: f32 = 20.0;
const WORLD_SCALE: f32 = 500.0;
/// Scene asset placement relative to the goal frame.
const MODEL_OFFSET: [f32; 3] = [-1.0, 2.0, 0.14];
const MODEL_BASE_SCALE: f32 = 0.25;

/// Ground slab corners, kept from the source scene.
const GROUND_CORNERS: [[f32; 3]; 4] = [
    [4.0, 0.0, 6.0],
    [4.0, 0.0, -6.0],
    [-4.0, 0.0, -6.0],
    [-4.0, 0.0, 6.0],
];

/// File locations for the scene asset and the three per-draw textures.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    pub model_dir: PathBuf,
    pub model_file: String,
    pub grass_texture: PathBuf,
    pub plastic_texture: PathBuf,
    pub ball_texture: PathBuf,
}

impl WorldConfig {
    /// Conventional layout: everything under one assets directory.
    pub fn from_assets_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            model_dir: dir.clone(),
            model_file: "ball.obj".to_owned(),
            grass_texture: dir.join("grass.png"),
            plastic_texture: dir.join("plastic.png"),
            ball_texture: dir.join("ball.png"),
        }
    }

    /// Same textures, different model file.
    pub fn with_model(mut self, model_dir: impl Into<PathBuf>, model_file: impl Into<String>) -> Self {
        self.model_dir = model_dir.into();
        self.model_file = model_file.into();
        self
    }
}

/// The scene: camera, goal frames, animated ball model, overlay.
pub struct World {
    /// Camera rotation about the X axis, degrees.
    pub rotation_x: f32,
    /// Camera rotation about the Y axis, degrees.
    pub rotation_y: f32,
    /// Distance from the camera to the scene. Not clamped; driving it
    /// negative inverts the scene.
    pub scene_distance: f32,
    pub animation: AnimationEngine,

    width: u32,
    height: u32,
    goal_height: f32,
    scene: SceneAsset,
    goal_post: Cylinder,
    crossbar: Cylinder,
    brace: Cylinder,
    config: WorldConfig,
    initialized: bool,
}

impl World {
    /// Creates a world over `config`. No I/O happens here; the scene asset
    /// loads in [`initialize`](World::initialize).
    pub fn new(config: WorldConfig, width: u32, height: u32) -> Self {
        let goal_height = GOAL_HEIGHTS[0];
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            scene_distance: INITIAL_DISTANCE,
            animation: AnimationEngine::new(),
            width,
            height,
            goal_height,
            scene: SceneAsset::new(config.model_dir.clone(), config.model_file.clone()),
            goal_post: Cylinder::new(0.1, 0.1, goal_height, 100, 100),
            crossbar: Cylinder::new(0.1, 0.1, 2.0, 100, 100),
            brace: Cylinder::new(0.1, 0.1, 1.0, 100, 100),
            config,
            initialized: false,
        }
    }

    /// One-time context setup: depth test, culling, color material, the two
    /// light sources, flat shading, scene asset load + GPU init, cylinder
    /// creation.
    ///
    /// An asset failure aborts initialization with the proxy left unloaded;
    /// the caller keeps any previously active world.
    pub fn initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), AssetLoadError> {
        backend.configure(&ContextSettings {
            depth_test: true,
            cull_back_faces: true,
            two_sided_color_material: true,
            flat_shading: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        });

        // Omnidirectional fill over the pitch.
        backend.set_light(
            0,
            &Light {
                position: [0.0, 10.0, 5.0],
                ambient: [0.3, 0.3, 0.3],
                diffuse: [0.9, 0.9, 0.9],
                spot: None,
            },
        );
        // Spot aimed along -Z with a 30 degree cutoff.
        backend.set_light(
            1,
            &Light {
                position: [0.0, 8.0, 6.0],
                ambient: [0.1, 0.1, 0.1],
                diffuse: [0.8, 0.8, 0.7],
                spot: Some(SpotParams {
                    direction: [0.0, 0.0, -1.0],
                    cutoff_deg: 30.0,
                }),
            },
        );

        self.scene.load()?;
        self.scene.initialize();

        self.goal_post.create_in_context(backend);
        self.crossbar.create_in_context(backend);
        self.brace.create_in_context(backend);

        self.initialized = true;
        Ok(())
    }

    /// Updates the viewport and recomputes the projection.
    ///
    /// `height == 0` is a caller precondition violation.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, width: u32, height: u32) {
        debug_assert!(height != 0, "resize to zero height");
        self.width = width;
        self.height = height;
        backend.set_viewport(0, 0, width as i32, height as i32);
        backend.set_perspective(45.0, width as f32 / height as f32, 0.5, 20000.0);
    }

    /// Renders one frame.
    ///
    /// The sequence always ends with a flush, even when a texture bind
    /// fails mid-frame; a failed bind is logged and the surface that needed
    /// it is skipped until the unconditional retry on the next frame.
    pub fn draw(&mut self, backend: &mut dyn RenderBackend, host: &mut dyn SurfaceControl) {
        debug_assert!(self.initialized, "draw() before initialize()");

        backend.clear();
        backend.load_identity();

        backend.scoped(|b| {
            b.set_viewport(0, 0, self.width as i32, self.height as i32);
            b.translate(0.0, 0.0, -self.scene_distance);
            b.rotate(self.rotation_x, [1.0, 0.0, 0.0]);
            b.rotate(self.rotation_y, [0.0, 1.0, 0.0]);
            b.rotate(BASE_TILT, [1.0, 0.0, 0.0]);
            b.scale(WORLD_SCALE, WORLD_SCALE, WORLD_SCALE);

            self.draw_ground(b);
            self.draw_goal_frames(b);

            self.animation.advance(host);

            self.draw_ball(b);
        });

        backend.scoped(|b| {
            self.draw_overlay(b);
        });

        backend.flush();
    }

    fn draw_ground(&self, backend: &mut dyn RenderBackend) {
        backend.set_color(0.0, 0.5, 0.0);
        if let Err(err) = TextureManager::bind(
            backend,
            &self.config.grass_texture,
            TextureOptions {
                modulate: true,
                sphere_map: false,
            },
        ) {
            log::warn!("skipping ground this frame: {err}");
            return;
        }

        // The slab repeats the grass texture along its long axis.
        let uv = |p: [f32; 3]| [(p[0] + 4.0) / 2.0, (p[2] + 6.0) / 2.0];
        let corner = |i: usize| Vertex::new(GROUND_CORNERS[i], [0.0, 1.0, 0.0], uv(GROUND_CORNERS[i]));
        backend.draw_triangles(&[
            corner(0),
            corner(1),
            corner(2),
            corner(2),
            corner(3),
            corner(0),
        ]);
    }

    fn draw_goal_frames(&mut self, backend: &mut dyn RenderBackend) {
        backend.set_color(1.0, 1.0, 1.0);
        if let Err(err) = TextureManager::bind(
            backend,
            &self.config.plastic_texture,
            TextureOptions {
                modulate: true,
                sphere_map: false,
            },
        ) {
            log::warn!("skipping goal frames this frame: {err}");
            return;
        }

        // The main post height follows the UI selection live.
        self.goal_post.height = self.goal_height;

        backend.rotate(-90.0, [1.0, 0.0, 0.0]);
        backend.translate(1.0, 5.0, 1.0);

        // Near frame: two posts, crossbar, brace.
        self.goal_post.render(backend);
        backend.translate(-2.0, 0.0, 0.0);
        self.goal_post.render(backend);
        backend.rotate(90.0, [0.0, 1.0, 0.0]);
        self.crossbar.render(backend);
        backend.rotate(-90.0, [0.0, 1.0, 0.0]);
        backend.translate(1.0, 0.0, -1.0);
        self.brace.render(backend);
        backend.translate(-1.0, 0.0, 1.0);

        // Far frame, mirrored down the pitch.
        backend.translate(0.0, -10.0, 0.0);
        self.goal_post.render(backend);
        backend.translate(2.0, 0.0, 0.0);
        self.goal_post.render(backend);
        backend.rotate(-90.0, [0.0, 1.0, 0.0]);
        self.crossbar.render(backend);
        backend.rotate(90.0, [0.0, 1.0, 0.0]);
        backend.translate(-1.0, 0.0, -1.0);
        self.brace.render(backend);
        backend.translate(1.0, 0.0, 0.0);
    }

    fn draw_ball(&mut self, backend: &mut dyn RenderBackend) {
        self.animation.apply_transform(backend);

        backend.translate(MODEL_OFFSET[0], MODEL_OFFSET[1], MODEL_OFFSET[2]);
        let s = MODEL_BASE_SCALE * self.animation.ball.scale as f32;
        backend.scale(s, s, s);

        if let Err(err) = TextureManager::bind(
            backend,
            &self.config.ball_texture,
            TextureOptions {
                modulate: false,
                sphere_map: true,
            },
        ) {
            log::warn!("skipping scene asset this frame: {err}");
            return;
        }
        self.scene.draw(backend);
    }

    fn draw_overlay(&self, backend: &mut dyn RenderBackend) {
        let (x, y, w, h) = self.overlay_viewport();
        backend.set_viewport(x, y, w, h);

        const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
        let lines: [(f32, &str); 5] = [
            (130.0, "Scene: goal practice"),
            (110.0, "Camera: E/D, S/F"),
            (90.0, "Zoom: numpad +/-"),
            (70.0, "Bounce: C"),
            (50.0, "Score: V"),
        ];
        for (line_y, text) in lines {
            backend.draw_text(0.0, line_y, YELLOW, text);
            backend.draw_text(0.0, line_y, YELLOW, &"_".repeat(text.len()));
        }

        backend.set_viewport(0, 0, self.width as i32, self.height as i32);
    }

    /// The corner region the overlay renders into. The size doubles as the
    /// origin offset; the convention is inherited and load-bearing for the
    /// text placement, so it is preserved exactly.
    pub fn overlay_viewport(&self) -> (i32, i32, i32, i32) {
        let w = self.width as i32;
        let h = self.height as i32;
        (w - 160, h - 130, w - 160, h - 130)
    }

    /// Releases the scene asset. Safe to call multiple times.
    pub fn dispose(&mut self) {
        self.scene.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.scene.is_disposed()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn model_path(&self) -> PathBuf {
        self.scene.path()
    }

    // Camera input, stepped the way the host UI drives it.

    /// Tilts the view up by one step; refuses at exactly [`TILT_MIN`].
    pub fn tilt_up(&mut self) {
        if self.rotation_x == TILT_MIN {
            return;
        }
        self.rotation_x -= TILT_STEP;
    }

    /// Tilts the view down by one step; refuses at exactly [`TILT_MAX`].
    pub fn tilt_down(&mut self) {
        if self.rotation_x == TILT_MAX {
            return;
        }
        self.rotation_x += TILT_STEP;
    }

    pub fn yaw_left(&mut self) {
        self.rotation_y -= YAW_STEP;
    }

    pub fn yaw_right(&mut self) {
        self.rotation_y += YAW_STEP;
    }

    pub fn zoom_in(&mut self) {
        self.scene_distance -= ZOOM_STEP;
    }

    pub fn zoom_out(&mut self) {
        self.scene_distance += ZOOM_STEP;
    }

    // Selection-index configuration, validated against the fixed tables.

    /// Applies a goal-height dropdown selection. Returns `false` for an
    /// out-of-range index.
    pub fn select_goal_height(&mut self, index: usize) -> bool {
        match GOAL_HEIGHTS.get(index) {
            Some(&height) => {
                self.goal_height = height;
                true
            }
            None => false,
        }
    }

    /// Applies a ball-scale dropdown selection.
    pub fn select_ball_scale(&mut self, index: usize) -> bool {
        match BALL_SCALES.get(index) {
            Some(&scale) => {
                self.animation.ball.scale = scale;
                true
            }
            None => false,
        }
    }

    /// Applies a spin-speed dropdown selection.
    pub fn select_spin_speed(&mut self, index: usize) -> bool {
        match BALL_SPIN_SPEEDS.get(index) {
            Some(&speed) => {
                self.animation.ball.rotation_speed = speed;
                true
            }
            None => false,
        }
    }

    /// Sets an arbitrary positive goal height outside the dropdown table.
    pub fn set_goal_height(&mut self, height: f32) {
        debug_assert!(height > 0.0);
        self.goal_height = height;
    }

    pub fn goal_height(&self) -> f32 {
        self.goal_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::trace::{Command, TraceBackend};

    #[derive(Default)]
    struct HostProbe {
        input_events: Vec<bool>,
    }

    impl SurfaceControl for HostProbe {
        fn set_input_enabled(&mut self, enabled: bool) {
            self.input_events.push(enabled);
        }

        fn request_close(&mut self) {}
    }

    fn temp_assets(tag: &str) -> (std::path::PathBuf, WorldConfig) {
        let dir = std::env::temp_dir().join(format!("goalmouth-world-{}-{}", std::process::id(), tag));
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(
            dir.join("ball.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n",
        )
        .unwrap();
        for name in ["grass.png", "plastic.png", "ball.png"] {
            image::RgbaImage::from_pixel(2, 2, image::Rgba([128, 128, 128, 255]))
                .save(dir.join(name))
                .unwrap();
        }

        let config = WorldConfig::from_assets_dir(&dir);
        (dir, config)
    }

    fn initialized_world(tag: &str) -> (std::path::PathBuf, World, TraceBackend) {
        let (dir, config) = temp_assets(tag);
        let mut world = World::new(config, 800, 600);
        let mut trace = TraceBackend::new();
        world.initialize(&mut trace).unwrap();
        (dir, world, trace)
    }

    #[test]
    fn tilt_steps_stay_within_bounds() {
        let (_dir, config) = temp_assets("tilt");
        let mut world = World::new(config, 800, 600);

        for _ in 0..30 {
            world.tilt_up();
        }
        assert_eq!(world.rotation_x, TILT_MIN);
        world.tilt_up();
        assert_eq!(world.rotation_x, TILT_MIN);

        for _ in 0..40 {
            world.tilt_down();
        }
        assert_eq!(world.rotation_x, TILT_MAX);
        world.tilt_down();
        assert_eq!(world.rotation_x, TILT_MAX);
    }

    #[test]
    fn zoom_is_unclamped() {
        let (_dir, config) = temp_assets("zoom");
        let mut world = World::new(config, 800, 600);
        for _ in 0..11 {
            world.zoom_in();
        }
        assert_eq!(world.scene_distance, 7000.0 - 11.0 * 700.0);
    }

    #[test]
    fn resize_projects_with_exact_aspect() {
        let (_dir, config) = temp_assets("resize");
        let mut world = World::new(config, 800, 600);
        let mut trace = TraceBackend::new();

        world.resize(&mut trace, 1024, 768);
        assert_eq!(
            trace.commands,
            vec![
                Command::Viewport([0, 0, 1024, 768]),
                Command::Perspective {
                    fovy_deg: 45.0,
                    aspect: 1024.0 / 768.0,
                    near: 0.5,
                    far: 20000.0,
                },
            ]
        );
    }

    #[test]
    fn resize_then_draw_is_stable() {
        let (dir, mut world, _init) = initialized_world("resizedraw");
        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();

        world.resize(&mut trace, 333, 177);
        world.draw(&mut trace, &mut host);
        assert_eq!(trace.commands.last(), Some(&Command::Flush));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn selection_tables_map_exactly() {
        let (_dir, config) = temp_assets("tables");
        let mut world = World::new(config, 800, 600);

        assert!(world.select_goal_height(2));
        assert_eq!(world.goal_height(), 5.0);
        assert!(world.select_ball_scale(3));
        assert_eq!(world.animation.ball.scale, 8.0);
        assert!(world.select_spin_speed(1));
        assert_eq!(world.animation.ball.rotation_speed, 3.0);

        assert!(!world.select_goal_height(4));
        assert!(!world.select_ball_scale(10));
        assert!(!world.select_spin_speed(4));
        assert_eq!(world.goal_height(), 5.0);
    }

    #[test]
    fn frame_runs_clear_to_flush_in_order() {
        let (dir, mut world, _init) = initialized_world("frame");
        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();

        world.draw(&mut trace, &mut host);

        assert_eq!(trace.commands.first(), Some(&Command::Clear));
        assert_eq!(trace.commands.last(), Some(&Command::Flush));
        // Three surfaces, three fresh uploads; nothing is cached.
        assert_eq!(trace.upload_count(), 3);

        // Ground, eight goal frame cylinders, one asset mesh.
        let draws = trace
            .commands
            .iter()
            .filter(|c| matches!(c, Command::DrawTriangles { .. }))
            .count();
        assert_eq!(draws, 10);

        // The sphere-mapped ball bind precedes the asset draw and follows
        // the goal frames.
        let sphere_on = trace
            .position_of(|c| matches!(c, Command::SphereMapping(true)))
            .unwrap();
        let last_draw = trace
            .commands
            .iter()
            .rposition(|c| matches!(c, Command::DrawTriangles { .. }))
            .unwrap();
        assert!(sphere_on < last_draw);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn every_frame_reuploads_the_same_textures() {
        let (dir, mut world, _init) = initialized_world("reupload");
        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();

        world.draw(&mut trace, &mut host);
        world.draw(&mut trace, &mut host);
        assert_eq!(trace.upload_count(), 6);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_textures_skip_surfaces_but_still_flush() {
        let (dir, mut world, _init) = initialized_world("missing");
        // Break every texture after initialization.
        for name in ["grass.png", "plastic.png", "ball.png"] {
            std::fs::remove_file(dir.join(name)).unwrap();
        }

        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();
        world.draw(&mut trace, &mut host);

        assert_eq!(trace.commands.first(), Some(&Command::Clear));
        assert_eq!(trace.commands.last(), Some(&Command::Flush));
        assert_eq!(trace.upload_count(), 0);
        assert!(!trace
            .commands
            .iter()
            .any(|c| matches!(c, Command::DrawTriangles { .. })));
        // The overlay is unaffected by texture failures.
        assert!(trace
            .commands
            .iter()
            .any(|c| matches!(c, Command::DrawText { .. })));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn overlay_viewport_reuses_size_as_origin() {
        let (dir, mut world, _init) = initialized_world("overlay");
        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();

        world.draw(&mut trace, &mut host);

        let overlay = trace
            .position_of(|c| *c == Command::Viewport([800 - 160, 600 - 130, 800 - 160, 600 - 130]))
            .expect("overlay viewport missing");
        let restore_after = trace.commands[overlay..]
            .iter()
            .position(|c| *c == Command::Viewport([0, 0, 800, 600]));
        assert!(restore_after.is_some());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn goal_post_height_follows_selection_each_frame() {
        let (dir, mut world, _init) = initialized_world("goalheight");
        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();

        world.select_goal_height(3);
        world.draw(&mut trace, &mut host);
        assert_eq!(world.goal_post.height, 6.0);

        world.set_goal_height(4.5);
        world.draw(&mut trace, &mut host);
        assert_eq!(world.goal_post.height, 4.5);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn scoring_animation_advances_during_draw() {
        let (dir, mut world, _init) = initialized_world("scoring");
        let mut trace = TraceBackend::new();
        let mut host = HostProbe::default();

        world.animation.start_scoring(&mut host);
        world.draw(&mut trace, &mut host);
        assert!(world.animation.ball.height > 0.0);
        assert_eq!(host.input_events, vec![false]);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn failed_initialize_leaves_world_unusable_and_reports() {
        let (dir, config) = temp_assets("badmodel");
        std::fs::remove_file(dir.join("ball.obj")).unwrap();

        let mut world = World::new(config, 800, 600);
        let mut trace = TraceBackend::new();
        assert!(matches!(
            world.initialize(&mut trace),
            Err(AssetLoadError::BadModel { .. })
        ));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn dispose_twice_is_a_noop() {
        let (dir, mut world, _init) = initialized_world("dispose");
        world.dispose();
        assert!(world.is_disposed());
        world.dispose();
        assert!(world.is_disposed());

        std::fs::remove_dir_all(dir).ok();
    }
}

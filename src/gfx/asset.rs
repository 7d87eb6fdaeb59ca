//! Imported scene asset proxy
//!
//! Owns the externally authored model for a world instance. Parsing is
//! delegated to the importer (`tobj`); this proxy tracks the resource
//! lifecycle `Unloaded -> Loaded -> Initialized -> Disposed` and issues the
//! mesh draw calls against the current transform.

use std::path::PathBuf;

use super::backend::{RenderBackend, Vertex};
use crate::error::AssetLoadError;

enum State {
    Unloaded,
    Loaded(Vec<tobj::Model>),
    /// Render-ready triangle lists, one per mesh in the hierarchy.
    Initialized(Vec<Vec<Vertex>>),
    Disposed,
}

/// Proxy over one imported scene.
///
/// Exactly one asset is live per world instance; replacing a world disposes
/// the old instance's resources before the new one takes over drawing.
pub struct SceneAsset {
    directory: PathBuf,
    file_name: String,
    state: State,
}

impl SceneAsset {
    /// Creates an unloaded proxy for `file_name` inside `directory`.
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            state: State::Unloaded,
        }
    }

    /// Full path of the model file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Parses the model file. `Unloaded -> Loaded`; on failure the proxy
    /// stays `Unloaded`.
    pub fn load(&mut self) -> Result<(), AssetLoadError> {
        assert!(
            matches!(self.state, State::Unloaded),
            "load() is only valid on an unloaded asset"
        );

        let path = self.path();
        let (models, _materials) = tobj::load_obj(
            &path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| AssetLoadError::BadModel {
            path: path.clone(),
            source,
        })?;

        self.state = State::Loaded(models);
        Ok(())
    }

    /// One-time expansion of the parsed meshes into render-ready triangle
    /// lists. `Loaded -> Initialized`.
    pub fn initialize(&mut self) {
        let models = match std::mem::replace(&mut self.state, State::Unloaded) {
            State::Loaded(models) => models,
            other => {
                self.state = other;
                panic!("initialize() is only valid on a loaded asset");
            }
        };

        let meshes = models
            .iter()
            .map(|model| expand_mesh(&model.mesh))
            .collect();
        self.state = State::Initialized(meshes);
    }

    /// Draws the mesh hierarchy against the current transform.
    ///
    /// Calling this before [`initialize`](SceneAsset::initialize) is a
    /// programming error.
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        let meshes = match &self.state {
            State::Initialized(meshes) => meshes,
            _ => panic!("draw() before initialize() on a scene asset"),
        };
        for mesh in meshes {
            backend.draw_triangles(mesh);
        }
    }

    /// Releases the asset's resources. Safe to call multiple times; only
    /// the first call does anything.
    pub fn dispose(&mut self) {
        if !matches!(self.state, State::Disposed) {
            self.state = State::Disposed;
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, State::Disposed)
    }

    pub fn is_unloaded(&self) -> bool {
        matches!(self.state, State::Unloaded)
    }
}

/// Expands a single-indexed mesh into a flat triangle list, computing
/// smooth vertex normals when the file carries none.
fn expand_mesh(mesh: &tobj::Mesh) -> Vec<Vertex> {
    let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
        mesh.normals.clone()
    } else {
        accumulate_vertex_normals(&mesh.positions, &mesh.indices)
    };

    mesh.indices
        .iter()
        .map(|&index| {
            let i = index as usize;
            let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            Vertex::new(
                [
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ],
                [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                uv,
            )
        })
        .collect()
}

/// Per-vertex normals from area-weighted face normals.
fn accumulate_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let p = |i: usize| {
            cgmath::Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2])
        };
        let face = cgmath::Vector3::cross(p(b) - p(a), p(c) - p(a));
        for &i in &[a, b, c] {
            normals[i * 3] += face.x;
            normals[i * 3 + 1] += face.y;
            normals[i * 3 + 2] += face.z;
        }
    }

    for n in normals.chunks_exact_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 0.0 {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::trace::{Command, TraceBackend};

    fn temp_model(contents: &str, tag: &str) -> (PathBuf, String) {
        let dir = std::env::temp_dir();
        let name = format!("goalmouth-asset-{}-{}.obj", std::process::id(), tag);
        std::fs::write(dir.join(&name), contents).unwrap();
        (dir, name)
    }

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";

    #[test]
    fn lifecycle_reaches_drawable_state() {
        let (dir, name) = temp_model(TRIANGLE_OBJ, "lifecycle");
        let mut asset = SceneAsset::new(&dir, &name);

        asset.load().unwrap();
        asset.initialize();
        assert!(asset.is_initialized());

        let mut trace = TraceBackend::new();
        asset.draw(&mut trace);
        assert_eq!(
            trace.commands,
            vec![Command::DrawTriangles { vertex_count: 3 }]
        );

        std::fs::remove_file(dir.join(name)).ok();
    }

    #[test]
    fn missing_normals_are_computed() {
        let (dir, name) = temp_model("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n", "normals");
        let mut asset = SceneAsset::new(&dir, &name);
        asset.load().unwrap();

        let meshes = match &asset.state {
            State::Loaded(models) => expand_mesh(&models[0].mesh),
            _ => unreachable!(),
        };
        for v in &meshes {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }

        std::fs::remove_file(dir.join(name)).ok();
    }

    #[test]
    fn failed_load_leaves_proxy_unloaded() {
        let mut asset = SceneAsset::new("/nonexistent", "missing.obj");
        assert!(matches!(
            asset.load(),
            Err(AssetLoadError::BadModel { .. })
        ));
        assert!(asset.is_unloaded());
    }

    #[test]
    fn dispose_is_idempotent() {
        let (dir, name) = temp_model(TRIANGLE_OBJ, "dispose");
        let mut asset = SceneAsset::new(&dir, &name);
        asset.load().unwrap();
        asset.initialize();

        asset.dispose();
        assert!(asset.is_disposed());
        asset.dispose();
        assert!(asset.is_disposed());

        std::fs::remove_file(dir.join(name)).ok();
    }

    #[test]
    #[should_panic(expected = "before initialize()")]
    fn draw_before_initialize_is_a_bug() {
        let asset = SceneAsset::new("/tmp", "whatever.obj");
        let mut trace = TraceBackend::new();
        asset.draw(&mut trace);
    }
}

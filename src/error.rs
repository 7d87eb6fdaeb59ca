//! Error taxonomy for the goalmouth engine
//!
//! Two failure classes exist: asset problems (bad path, unsupported or
//! corrupt file) which are recoverable at the world boundary, and rendering
//! context setup failures which are fatal to the session.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load an external asset (texture image or scene model).
///
/// Returned by texture binds and scene asset loads. The operation that
/// failed leaves previously established state intact: a failed texture bind
/// keeps the prior texture bound, a failed scene load leaves the proxy
/// unloaded and any previously active world untouched.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    /// The file could not be read at all.
    #[error("unreadable asset {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but could not be decoded as an image.
    #[error("unsupported or corrupt image {}: {source}", path.display())]
    BadImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The file was read but could not be parsed as a model.
    #[error("unsupported or corrupt model {}: {source}", path.display())]
    BadModel {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
}

/// Fatal failure while setting up the rendering context.
///
/// There is no recovery path: the session terminates.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    #[error("failed to create rendering surface: {0}")]
    Surface(String),

    #[error("failed to acquire graphics device: {0}")]
    Device(String),
}

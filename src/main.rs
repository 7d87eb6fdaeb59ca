use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use goalmouth::{GoalmouthApp, WorldConfig};

/// Interactive 3D goal scene with procedural ball animations.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the textures and the default ball model.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Model file to load instead of the bundled ball.
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = WorldConfig::from_assets_dir(&args.assets);
    if let Some(model) = args.model {
        let dir = model
            .parent()
            .context("model path has no parent directory")?
            .to_path_buf();
        let file = model
            .file_name()
            .context("model path has no file name")?
            .to_string_lossy()
            .into_owned();
        config = config.with_model(dir, file);
    }

    GoalmouthApp::new(config).run();
    Ok(())
}

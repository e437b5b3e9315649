/// shade3d terminal viewer
///
/// Renders an STL file (or a cube) with any of the four shading modes.
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera, E/R: Roll
///   - +/-: Zoom, 0-3: Shading mode, P/O/B: Projection, L: Lighting
///   - Space: Pause spin, Q/ESC: Quit
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use shade3d_core::{stl, Mesh, ProjectionMode, RendererConfig, ShadingMode};
use shade3d_terminal::{TerminalApp, TextureSources};

/// Radius STL models are scaled to so they fit the default camera
const MODEL_RADIUS: f32 = 1.5;

fn main() {
    env_logger::init();
    if let Err(err) = run(CliOptions::parse()) {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run(options: CliOptions) -> Result<()> {
    let mut config = match &options.config {
        Some(path) => RendererConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RendererConfig::default(),
    };
    if let Some(mode) = options.mode {
        config.shading_mode = mode.into();
    }
    if let Some(projection) = options.projection {
        config.projection = projection.into();
    }
    config.shading |= options.lighting;

    let mesh = match &options.model {
        Some(path) => load_model(path)?,
        None => Mesh::cube(2.0),
    };
    let textures = options.texture_sources();

    if options.snapshot {
        let mut app = TerminalApp::with_size(mesh, config, &textures, 80, 40)?;
        print!("{}", app.snapshot()?);
        return Ok(());
    }

    let mut app = TerminalApp::new(mesh, config, &textures)?;
    app.run()
}

fn load_model(path: &Path) -> Result<Mesh> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut mesh =
        stl::parse_stl(&data).with_context(|| format!("failed to parse {}", path.display()))?;
    mesh.fit_to_radius(MODEL_RADIUS);
    info!("loaded {} triangles from {}", mesh.triangles.len(), path.display());
    Ok(mesh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Unlit,
    Textured,
    Environment,
    Bump,
}

impl From<ModeArg> for ShadingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Unlit => ShadingMode::Unlit,
            ModeArg::Textured => ShadingMode::Textured,
            ModeArg::Environment => ShadingMode::Environment,
            ModeArg::Bump => ShadingMode::Bump,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProjectionArg {
    Perspective,
    Orthographic,
    Oblique,
}

impl From<ProjectionArg> for ProjectionMode {
    fn from(projection: ProjectionArg) -> Self {
        match projection {
            ProjectionArg::Perspective => ProjectionMode::Perspective,
            ProjectionArg::Orthographic => ProjectionMode::Orthographic,
            ProjectionArg::Oblique => ProjectionMode::Oblique,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shade3d-terminal")]
#[command(version, about = "Render an STL model in the terminal with four shading modes")]
struct CliOptions {
    /// STL file to render; a cube when omitted
    model: Option<PathBuf>,

    /// TOML renderer configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Diffuse texture image
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Normal map image for bump mode
    #[arg(long)]
    bump: Option<PathBuf>,

    /// Directory holding the six cube face images
    #[arg(long)]
    cubemap: Option<PathBuf>,

    /// Startup shading mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Startup projection
    #[arg(long, value_enum)]
    projection: Option<ProjectionArg>,

    /// Start with lighting on
    #[arg(long)]
    lighting: bool,

    /// Print one frame as text and exit
    #[arg(long)]
    snapshot: bool,
}

impl CliOptions {
    fn texture_sources(&self) -> TextureSources {
        TextureSources {
            diffuse: self.texture.clone(),
            bump: self.bump.clone(),
            cubemap_dir: self.cubemap.clone(),
        }
    }
}

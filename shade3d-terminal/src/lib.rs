/// Terminal front end: drives a [`Renderer`] over the software backend
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use log::{info, warn};
use nalgebra::Matrix4;
use shade3d_core::{
    Mesh, ProjectionMode, Renderer, RendererConfig, SamplerBindings, TextureSlot,
    Transform, VertexStreams,
};
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub mod renderer;
pub mod textures;

pub use renderer::{CubeTextureId, Framebuffer, SoftwareBackend, Texture2dId, TextureBank};

/// Degrees per rotate key press
const ROTATE_STEP: f32 = 5.0;
/// Camera distance change per +/- press
const ZOOM_STEP: f32 = 0.5;
/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: u32 = 2;

/// Where the demo textures come from; procedural when a path is absent
#[derive(Debug, Clone, Default)]
pub struct TextureSources {
    pub diffuse: Option<PathBuf>,
    pub bump: Option<PathBuf>,
    pub cubemap_dir: Option<PathBuf>,
}

/// The three textures the modes read
#[derive(Debug, Clone, Copy)]
struct DemoTextures {
    diffuse: Texture2dId,
    environment: CubeTextureId,
    bump: Texture2dId,
}

impl DemoTextures {
    fn install(backend: &mut SoftwareBackend, sources: &TextureSources) -> Self {
        let diffuse = match &sources.diffuse {
            Some(path) => textures::load_texture_2d("diffuse", path.clone()),
            None => TextureSlot::ready(
                "diffuse",
                textures::checkerboard(64, 8, [230, 230, 230, 255], [200, 60, 40, 255]),
            ),
        };
        let bump = match &sources.bump {
            Some(path) => textures::load_texture_2d("bump", path.clone()),
            None => TextureSlot::ready("bump", textures::tile_normal_map(64, 4)),
        };
        let environment = match &sources.cubemap_dir {
            Some(dir) => textures::load_cube_texture("environment", dir.clone()),
            None => TextureSlot::ready("environment", textures::gradient_cube()),
        };
        Self {
            diffuse: backend.add_texture_2d(diffuse),
            environment: backend.add_cube_texture(environment),
            bump: backend.add_texture_2d(bump),
        }
    }

    /// Put each texture on the unit its sampler reads for the current mode
    fn bind(&self, backend: &mut SoftwareBackend, units: SamplerBindings) {
        backend.bind_texture_2d(units.diffuse, self.diffuse);
        backend.bind_cube_texture(units.cubemap, self.environment);
        backend.bind_texture_2d(units.bump, self.bump);
    }
}

/// Main application struct for terminal rendering
pub struct TerminalApp {
    streams: VertexStreams,
    renderer: Renderer<SoftwareBackend>,
    textures: DemoTextures,
    rotation: [f32; 3],
    spin: f32,
    spinning: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mesh: Mesh, config: RendererConfig, sources: &TextureSources) -> Result<Self> {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        Self::with_size(mesh, config, sources, width as usize, height as usize)
    }

    pub fn with_size(
        mut mesh: Mesh,
        config: RendererConfig,
        sources: &TextureSources,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let mut backend = SoftwareBackend::new(width, height);
        let textures = DemoTextures::install(&mut backend, sources);

        let config = config.with_viewport(width as u32, height as u32 * CELL_ASPECT);
        config.validate()?;
        let rotation = [
            config.camera.x_radian.to_degrees(),
            config.camera.y_radian.to_degrees(),
            config.camera.z_radian.to_degrees(),
        ];
        let renderer =
            Renderer::new(backend, &config).context("failed to set up the projection")?;

        if mesh.triangles.iter().all(|t| t.vertices.iter().all(|v| v.tex_coord.norm() == 0.0)) {
            mesh.project_tex_coords(1.0);
        }
        let streams = mesh.expand();
        streams.validate()?;
        info!("mesh ready: {} vertices", streams.vertex_count());

        let mut app = Self {
            streams,
            renderer,
            textures,
            rotation,
            spin: 0.0,
            spinning: true,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        };
        app.rebind_textures();
        Ok(app)
    }

    pub fn renderer(&self) -> &Renderer<SoftwareBackend> {
        &self.renderer
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    /// Render one frame and return it as plain characters
    pub fn snapshot(&mut self) -> Result<String> {
        self.render_frame()?;
        Ok(self.renderer.backend().framebuffer().to_ascii())
    }

    fn main_loop(&mut self) -> Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            if self.spinning {
                self.spin += 0.02;
            }

            self.render_frame()?;
            self.present()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => self.handle_key(code),
            Event::Resize(width, height) => {
                self.renderer
                    .backend_mut()
                    .resize(width as usize, height as usize);
                self.renderer
                    .resize(width as u32, height as u32 * CELL_ASPECT)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Apply one key press to the render state
    pub fn handle_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') | KeyCode::Up => self.rotate(0, -ROTATE_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.rotate(0, ROTATE_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.rotate(1, -ROTATE_STEP),
            KeyCode::Char('d') | KeyCode::Right => self.rotate(1, ROTATE_STEP),
            KeyCode::Char('e') => self.rotate(2, ROTATE_STEP),
            KeyCode::Char('r') => self.rotate(2, -ROTATE_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(-ZOOM_STEP),
            KeyCode::Char('-') => self.zoom(ZOOM_STEP),
            KeyCode::Char(c @ '0'..='3') => {
                self.renderer.set_mapping_type_ordinal(c as i32 - '0' as i32);
                self.rebind_textures();
            }
            KeyCode::Char('p') => self.renderer.set_projection(ProjectionMode::Perspective)?,
            KeyCode::Char('o') => self.renderer.set_projection(ProjectionMode::Orthographic)?,
            KeyCode::Char('b') => self.renderer.set_projection(ProjectionMode::Oblique)?,
            KeyCode::Char('l') => {
                let shading = !self.renderer.state().shading;
                self.renderer.set_shading(shading);
            }
            KeyCode::Char(' ') => self.spinning = !self.spinning,
            _ => {}
        }
        Ok(())
    }

    fn rotate(&mut self, axis: usize, step: f32) {
        const AXES: [&str; 3] = ["x", "y", "z"];
        self.rotation[axis] += step;
        self.renderer.rotate_camera(self.rotation[axis], AXES[axis]);
    }

    fn zoom(&mut self, step: f32) {
        let distance = self.renderer.state().camera.distance + step;
        self.renderer.move_camera_to(distance.max(ZOOM_STEP));
    }

    fn rebind_textures(&mut self) {
        let units = self.renderer.sampler_bindings();
        self.textures.bind(self.renderer.backend_mut(), units);
    }

    fn model_matrix(&self) -> Matrix4<f32> {
        Transform::euler_model(self.spin * 0.7, self.spin, 0.0)
    }

    fn render_frame(&mut self) -> Result<()> {
        let model = self.model_matrix();
        let backend = self.renderer.backend_mut();
        backend.refresh_textures();
        backend.clear();
        if let Err(err) = self.renderer.draw(&self.streams, &model) {
            warn!("frame skipped: {err}");
        }
        Ok(())
    }

    fn present(&self) -> Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.backend().framebuffer().draw(&mut stdout)?;

        let state = self.renderer.state();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "shade3d | FPS: {:.1} | {} | {} | light {} | WASD/ER=rotate +/-=zoom 0-3=mode p/o/b=projection l=light space=spin q=quit",
                self.fps,
                state.projection_mode,
                state.mode,
                if state.shading { "on" } else { "off" },
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

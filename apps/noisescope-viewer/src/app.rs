//! Viewer application: noise plotted into the display texture plus the test
//! entities.

use glam::Vec3;
use tracing::info;

use noisescope_app::{AppContext, FrameContext, HarnessApp, KeyCode};
use noisescope_gpu::Texture;
use noisescope_noise::{Canvas, NoiseGraphs, NoiseMode, NoisePatch};
use noisescope_render::{
    shapes, Display, Entities, Entity, HarnessPipelines, MeshData, PipelineKind, Transform,
    View, CLEAR_COLOR,
};

use crate::controls::{interp_choice, look, movement};

/// Size of both entities, matching the display's 16:9 aspect.
const ENTITY_SCALE: Vec3 = Vec3::new(16.0, 9.0, 1.0);

/// Command line options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerParams {
    pub mode: NoiseMode,
    pub seed: Option<u64>,
    pub vsync: bool,
    pub no_validation: bool,
}

impl ViewerParams {
    pub fn from_args() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    /// Parse options; unknown or malformed ones are ignored.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut params = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mode" => match args.next().as_deref() {
                    Some("1d") => params.mode = NoiseMode::Graphs,
                    Some("2d") => params.mode = NoiseMode::Patch,
                    _ => {}
                },
                "--seed" => {
                    if let Some(seed) = args.next().and_then(|v| v.parse().ok()) {
                        params.seed = Some(seed);
                    }
                }
                "--vsync" => params.vsync = true,
                "--no-validation" => params.no_validation = true,
                _ => {}
            }
        }

        params
    }
}

pub struct Viewer {
    view: View,
    entities: Entities,
    mesh_data: MeshData,
    texture: Texture,
    pipelines: HarnessPipelines,
    display: Display,
    mode: NoiseMode,
    graphs: NoiseGraphs,
    patch: NoisePatch,
}

impl Viewer {
    fn set_mode(&mut self, mode: NoiseMode) {
        self.mode = mode;
        self.view.transform.position.z = mode.view_distance();
        info!("Noise mode: {mode:?}");
    }

    fn noise_controls(&mut self, ctx: &AppContext) {
        let input = &ctx.input;

        if input.key_pressed(KeyCode::Tab) {
            self.set_mode(self.mode.toggled());
        }

        if let Some(interp) = interp_choice(input) {
            self.graphs.set_interp(interp);
            self.patch.set_interp(interp);
            info!("Interpolation: {interp:?}");
        }

        if input.key_pressed(KeyCode::KeyG) {
            let seed = rand::random();
            self.graphs.reseed(seed);
            self.patch.reseed(seed);
            info!("Reseeded noise with {seed}");
        }

        if self.mode == NoiseMode::Patch {
            if input.key_down(KeyCode::ArrowRight) {
                self.patch.increase_frequency();
            }
            if input.key_down(KeyCode::ArrowLeft) {
                self.patch.decrease_frequency();
            }
        }
    }
}

impl HarnessApp for Viewer {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let params = ViewerParams::from_args();
        let seed = params.seed.unwrap_or_else(rand::random);
        info!("Noise seed {seed}, mode {:?}", params.mode);

        let (width, height) = (ctx.width(), ctx.height());

        let mut mesh_data = MeshData::create(&mut ctx.memory)?;
        let triangle = shapes::triangle()?.upload(&mut ctx.memory, &mut mesh_data)?;
        let quad = shapes::quad()?.upload(&mut ctx.memory, &mut mesh_data)?;

        let mut entities = Entities::new();
        let transform = Transform {
            scale: ENTITY_SCALE,
            ..Transform::default()
        };
        entities.push(Entity::new(transform, triangle, PipelineKind::Test))?;
        entities.push(Entity::new(transform, quad, PipelineKind::Texture))?;

        let texture = Texture::create(&ctx.gpu, &ctx.memory, width, height, "display")?;
        let pipelines =
            unsafe { HarnessPipelines::new(ctx.device(), &ctx.render_pass, ctx.extent(), &texture)? };

        let mut viewer = Self {
            view: View::default(),
            entities,
            mesh_data,
            texture,
            pipelines,
            display: Display::new(width, height),
            mode: params.mode,
            graphs: NoiseGraphs::new(width, height, seed),
            patch: NoisePatch::new(width, height, seed),
        };
        viewer.set_mode(params.mode);
        Ok(viewer)
    }

    fn update(&mut self, ctx: &mut AppContext, _dt: f32) -> anyhow::Result<()> {
        if ctx.input.key_pressed(KeyCode::Escape) {
            ctx.input.request_close();
            return Ok(());
        }

        self.view.transform.local_translate(movement(&ctx.input));
        if let Some(turn) = look(&ctx.input) {
            self.view.rotate(turn.x, turn.y);
        }

        self.noise_controls(ctx);
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut AppContext) -> anyhow::Result<()> {
        self.display.clear(CLEAR_COLOR);
        match self.mode {
            NoiseMode::Graphs => self.graphs.draw(&mut self.display),
            NoiseMode::Patch => self.patch.draw(&mut self.display),
        }
        self.display.upload(&mut ctx.memory, &self.texture)?;

        self.entities.update(self.view.view_projection(ctx.aspect_ratio()));
        Ok(())
    }

    fn render(&mut self, ctx: &AppContext, frame: &FrameContext) -> anyhow::Result<()> {
        unsafe {
            self.pipelines.record_entities(
                ctx.device(),
                frame.command_buffer,
                &self.entities,
                &self.mesh_data,
            );
        }
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut AppContext) {
        unsafe {
            self.pipelines.destroy(ctx.device());
            if let Err(e) = self.texture.destroy(&ctx.gpu) {
                tracing::error!("Failed to free display texture: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ViewerParams {
        ViewerParams::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse(&[]), ViewerParams::default());
        assert_eq!(parse(&[]).mode, NoiseMode::Graphs);
    }

    #[test]
    fn parses_every_option() {
        let params = parse(&["--mode", "2d", "--seed", "7", "--vsync", "--no-validation"]);
        assert_eq!(
            params,
            ViewerParams {
                mode: NoiseMode::Patch,
                seed: Some(7),
                vsync: true,
                no_validation: true,
            }
        );
    }

    #[test]
    fn malformed_values_are_ignored() {
        let params = parse(&["--seed", "many", "--mode", "3d", "--bogus"]);
        assert_eq!(params.seed, None);
        assert_eq!(params.mode, NoiseMode::Graphs);
    }
}

mod cli;
mod config;

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec4};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Demo};
use config::Settings;
use effects::{dissolve, jelly, ripple, BuiltDemo};
use fieldgraph::ImageGrid;
use renderer::{ColorRule, InteractionMode, RenderBinding, RunConfig, ScaleRule};
use scheduler::probe::OrbitCamera;

fn main() -> Result<()> {
    let cli = cli::parse();
    initialise_tracing();
    run(cli)
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let window_size = cli.size.unwrap_or((1280, 720));
    let fov = 35f32.to_radians();

    let config = match cli.demo {
        Demo::Jelly => {
            let mesh = renderer::uv_sphere(0.5, 48, 32);
            let mut demo = jelly(&mesh.positions)?;
            settings.apply(cli.demo.settings_key(), &mut demo.sim);
            let binding = RenderBinding::new(
                demo.bindings.position,
                ColorRule::Constant([0.62, 0.53, 0.97, 1.0]),
                ScaleRule::Constant(0.02),
            );
            RunConfig {
                title: "fieldlab: jelly".to_string(),
                demo,
                binding,
                interaction: InteractionMode::Pinch { mesh },
                camera: OrbitCamera::new(2.0, fov, 1.0),
                window_size,
                probe_seed: cli.seed,
            }
        }
        Demo::Ripple => {
            let side = cli.side.unwrap_or(100);
            let image = load_image(cli.image.as_deref(), side)?;
            let mut demo = ripple(side, image)?;
            settings.apply(cli.demo.settings_key(), &mut demo.sim);
            let binding = grid_binding(&demo, side, None);
            RunConfig {
                title: "fieldlab: ripple".to_string(),
                demo,
                binding,
                interaction: InteractionMode::LatticeClick { side },
                camera: OrbitCamera::new(60.0, fov, 1.0),
                window_size,
                probe_seed: cli.seed,
            }
        }
        Demo::Dissolve => {
            let side = cli.side.unwrap_or(200);
            let image = load_image(cli.image.as_deref(), side)?;
            let target = load_image(cli.image_target.as_deref(), side)?;
            let mut demo = dissolve(side, image, target, cli.seed)?;
            settings.apply(cli.demo.settings_key(), &mut demo.sim);
            let fade = ScaleRule::FadeRemap {
                progress: demo.bindings.progress.expect("dissolve exposes progress"),
                random: demo.bindings.random.expect("dissolve exposes random"),
                threshold: effects::dissolve::THRESHOLD.to_string(),
                fade_duration: effects::dissolve::FADE_DURATION.to_string(),
                progress_damping: effects::dissolve::PROGRESS_DAMPING.to_string(),
                base: mesh_scale(side),
            };
            let binding = grid_binding(&demo, side, Some(fade));
            RunConfig {
                title: "fieldlab: dissolve".to_string(),
                demo,
                binding,
                interaction: InteractionMode::ClickReset,
                camera: OrbitCamera::new(60.0, fov, 1.0),
                window_size,
                probe_seed: cli.seed,
            }
        }
    };

    renderer::run(config)
}

/// The lattice spans 30 world units regardless of its resolution.
fn mesh_scale(side: u32) -> f32 {
    30.0 / side as f32
}

fn grid_binding(demo: &BuiltDemo, side: u32, scale: Option<ScaleRule>) -> RenderBinding {
    RenderBinding::new(
        demo.bindings.position,
        demo.bindings
            .color
            .map(ColorRule::Buffer)
            .unwrap_or(ColorRule::Constant([1.0; 4])),
        scale.unwrap_or(ScaleRule::Constant(mesh_scale(side))),
    )
}

/// Loads an image into a sampleable grid, flipping rows so `v = 0` is the
/// bottom of the picture like the lattice's row 0. Falls back to a
/// procedural gradient when no path is given.
fn load_image(path: Option<&Path>, side: u32) -> Result<ImageGrid> {
    match path {
        Some(path) => {
            let image = image::open(path)
                .with_context(|| format!("loading image {}", path.display()))?
                .to_rgba8();
            let (width, height) = image.dimensions();
            let mut texels = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    let texel = image.get_pixel(x, height - 1 - y);
                    texels.push(Vec4::new(
                        texel[0] as f32 / 255.0,
                        texel[1] as f32 / 255.0,
                        texel[2] as f32 / 255.0,
                        texel[3] as f32 / 255.0,
                    ));
                }
            }
            ImageGrid::new(width as usize, height as usize, texels).map_err(Into::into)
        }
        None => Ok(synthetic_image(side.max(8) as usize)),
    }
}

/// Procedural stand-in so the demos run without bundled assets.
fn synthetic_image(size: usize) -> ImageGrid {
    ImageGrid::from_fn(size, size, |uv| {
        let swirl = fieldgraph::noise::noise3(glam::Vec3::new(uv.x * 6.0, uv.y * 6.0, 0.0));
        let bands = ((uv - Vec2::splat(0.5)).length() * 18.0).sin() * 0.5 + 0.5;
        Vec4::new(
            0.2 + 0.8 * uv.x,
            0.25 + 0.5 * bands,
            0.4 + 0.6 * (swirl * 0.5 + 0.5),
            1.0,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_image_covers_unit_alpha() {
        let image = synthetic_image(16);
        assert_eq!(image.width(), 16);
        let texel = image.sample(Vec2::new(0.5, 0.5));
        assert_eq!(texel.w, 1.0);
    }

    #[test]
    fn mesh_scale_keeps_lattice_extent_fixed() {
        assert_eq!(mesh_scale(100) * 100.0, 30.0);
        assert_eq!(mesh_scale(200) * 200.0, 30.0);
    }
}

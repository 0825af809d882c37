//! Winit preview window driving the frame scheduler.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::{error, info};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use fieldgraph::Simulation;
use scheduler::probe::{InteractionProbe, OrbitCamera};
use scheduler::{FrameScheduler, RenderSink};

use crate::binding::RenderBinding;
use crate::context::GpuContext;
use crate::pipeline::{InstanceData, InstancePipeline};
use crate::{DeviceError, InteractionMode, RunConfig};

/// Owns the GPU side of a run and doubles as the scheduler's render sink.
struct GpuRenderer {
    ctx: GpuContext,
    pipeline: InstancePipeline,
    binding: RenderBinding,
    camera: OrbitCamera,
    instances: Vec<InstanceData>,
}

impl GpuRenderer {
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.ctx.resize(new_size);
        self.camera.set_aspect(self.ctx.aspect());
    }
}

impl RenderSink for GpuRenderer {
    fn submit(
        &mut self,
        sim: &Simulation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.binding.compose(sim, &mut self.instances);
        self.pipeline
            .upload(&self.ctx.queue, &self.camera, &self.instances);

        let frame = match self.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Transient; reconfigure and present again next beat.
                self.ctx.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(err) => return Err(Box::new(DeviceError::Lost(err.to_string()))),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.03,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.pipeline.draw(&mut pass, self.instances.len() as u32);
        }
        self.ctx.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Opens the preview window and runs the demo until it is closed or the
/// scheduler disposes itself after a fatal error.
pub fn run(config: RunConfig) -> Result<()> {
    let RunConfig {
        title,
        demo,
        binding,
        interaction,
        mut camera,
        window_size,
        probe_seed,
    } = config;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&title)
            .with_inner_size(LogicalSize::new(window_size.0, window_size.1))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let ctx = GpuContext::new(window.clone())?;
    camera.set_aspect(ctx.aspect());
    let element_count = demo.sim.element_count();
    let pipeline = InstancePipeline::new(&ctx.device, ctx.config.format, element_count);
    let mut renderer = GpuRenderer {
        ctx,
        pipeline,
        binding,
        camera,
        instances: Vec::with_capacity(element_count),
    };

    let mut scheduler = FrameScheduler::new(demo.sim);
    scheduler.initialize(Instant::now())?;
    info!(elements = element_count, title = %title, "demo initialized");

    let mut probe = InteractionProbe::new(probe_seed);
    let mut pointer_ndc = Vec2::ZERO;

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        scheduler.dispose();
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let size = renderer.ctx.size;
                        pointer_ndc = Vec2::new(
                            position.x as f32 / size.width.max(1) as f32 * 2.0 - 1.0,
                            -(position.y as f32 / size.height.max(1) as f32 * 2.0 - 1.0),
                        );
                        if let InteractionMode::Pinch { mesh } = &interaction {
                            if let Some(sim) = scheduler.simulation_mut() {
                                let hit = probe.resolve(pointer_ndc, &renderer.camera, mesh);
                                InteractionProbe::write_pointer(sim, hit.as_ref());
                            }
                        }
                    }
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => match &interaction {
                        InteractionMode::LatticeClick { side } => {
                            let timestamp = scheduler.elapsed_seconds(Instant::now());
                            let event = probe.lattice_click(*side, timestamp);
                            scheduler.queue_influence(event);
                        }
                        InteractionMode::ClickReset => {
                            if let Some(sim) = scheduler.simulation_mut() {
                                if let Err(err) = sim.dispatch_reset() {
                                    error!(error = %err, "reset dispatch failed");
                                    scheduler.dispose();
                                    elwt.exit();
                                }
                            }
                        }
                        InteractionMode::Pinch { .. } => {}
                    },
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = scheduler.beat(Instant::now(), &mut renderer) {
                            error!(error = %err, "scheduling beat failed; shutting down");
                            elwt.exit();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .context("event loop terminated abnormally")?;

    Ok(())
}

use anyhow::{anyhow, bail, Result};
use shaderload::ShaderText;

use crate::simulation::{
    Channel, FlockingUniforms, PassInputs, ProgramKind, SeedTexture, SimulationBackend, SlotId,
    SurfaceArena, TextureRef,
};

use super::context::{AdapterProfile, GpuContext};
use super::pipeline::{PipelineLayouts, SimulationPipeline};
use super::targets::SurfaceTarget;

/// Headless wgpu implementation of [`SimulationBackend`].
pub struct WgpuBackend {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    surfaces: SurfaceArena<Option<SurfaceTarget>>,
    position_seed: Option<SurfaceTarget>,
    velocity_seed: Option<SurfaceTarget>,
}

impl WgpuBackend {
    pub fn new() -> Result<Self> {
        let context = GpuContext::new()?;
        let device = &context.device;
        let layouts = PipelineLayouts::new(device);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flocking params"),
            size: std::mem::size_of::<FlockingUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("flocking params bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let surfaces = SurfaceArena::try_new(|_| Ok::<_, anyhow::Error>(None))?;

        Ok(Self {
            context,
            layouts,
            uniform_buffer,
            uniform_bind_group,
            surfaces,
            position_seed: None,
            velocity_seed: None,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    fn seed_mut(&mut self, channel: Channel) -> &mut Option<SurfaceTarget> {
        match channel {
            Channel::Position => &mut self.position_seed,
            Channel::Velocity => &mut self.velocity_seed,
        }
    }

    fn resolve(&self, texture: TextureRef) -> Result<&SurfaceTarget> {
        match texture {
            TextureRef::Seed(channel) => match channel {
                Channel::Position => self.position_seed.as_ref(),
                Channel::Velocity => self.velocity_seed.as_ref(),
            }
            .ok_or_else(|| anyhow!("{channel:?} seed has not been uploaded")),
            TextureRef::Slot(slot) => self.surface(slot),
        }
    }

    fn surface(&self, slot: SlotId) -> Result<&SurfaceTarget> {
        self.surfaces[slot]
            .as_ref()
            .ok_or_else(|| anyhow!("surface {slot} has not been allocated"))
    }
}

impl SimulationBackend for WgpuBackend {
    type Program = SimulationPipeline;

    fn compile(&mut self, kind: ProgramKind, text: &ShaderText) -> Result<Self::Program> {
        SimulationPipeline::new(&self.context.device, &self.layouts, kind, text)
    }

    fn allocate(&mut self, slot: SlotId, width: u32, height: u32) -> Result<()> {
        let max = self.context.adapter_profile.max_texture_dimension;
        if width > max || height > max {
            bail!("surface {slot} of {width}x{height} exceeds the adapter limit of {max}");
        }
        self.surfaces[slot] = Some(SurfaceTarget::new(
            &self.context.device,
            slot.label(),
            width,
            height,
        ));
        Ok(())
    }

    fn upload_seed(&mut self, channel: Channel, seed: &SeedTexture) -> Result<()> {
        let label = match channel {
            Channel::Position => "position seed",
            Channel::Velocity => "velocity seed",
        };
        let target = SurfaceTarget::new(&self.context.device, label, seed.width, seed.width);
        target.upload(&self.context.queue, &seed.data)?;
        *self.seed_mut(channel) = Some(target);
        Ok(())
    }

    fn draw(
        &mut self,
        program: &Self::Program,
        inputs: PassInputs,
        target: SlotId,
        uniforms: &FlockingUniforms,
    ) -> Result<()> {
        let device = &self.context.device;
        let position = self.resolve(inputs.position)?;
        let velocity = self.resolve(inputs.velocity)?;
        let output = self.surface(target)?;

        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("simulation textures"),
            layout: &self.layouts.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&position.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&velocity.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.layouts.sampler),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(program.kind.fragment_program()),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(target.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &texture_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
        tracing::trace!(program = program.kind.fragment_program(), %target, "simulation pass");
        Ok(())
    }

    fn read_back(&mut self, slot: SlotId, out: &mut [f32]) -> Result<()> {
        self.surface(slot)?
            .read_back(&self.context.device, &self.context.queue, out)
    }
}

use std::sync::mpsc;

use anyhow::{anyhow, bail, Context, Result};

pub(crate) const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const BYTES_PER_TEXEL: u32 = 16;

/// One RGBA32F simulation surface.
pub(crate) struct SurfaceTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl SurfaceTarget {
    pub(crate) fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub(crate) fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Uploads four floats per texel, row-major.
    pub(crate) fn upload(&self, queue: &wgpu::Queue, data: &[f32]) -> Result<()> {
        if data.len() != self.texel_count() * 4 {
            bail!(
                "seed holds {} floats but the surface needs {}",
                data.len(),
                self.texel_count() * 4
            );
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * BYTES_PER_TEXEL),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Copies the surface into `out` and blocks until the GPU is done.
    pub(crate) fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        out: &mut [f32],
    ) -> Result<()> {
        if out.len() != self.texel_count() * 4 {
            bail!(
                "readback buffer holds {} floats but the surface has {}",
                out.len(),
                self.texel_count() * 4
            );
        }

        let unpadded_bytes_per_row = self.width * BYTES_PER_TEXEL;
        let padded_bytes_per_row = padded_row(unpadded_bytes_per_row);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("simulation readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("simulation readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("failed waiting for GPU readback: {err}"))?;
        receiver
            .recv()
            .map_err(|_| anyhow!("failed receiving GPU map callback"))?
            .context("GPU buffer mapping failed")?;

        {
            let mapped = slice.get_mapped_range();
            copy_tight_rows(
                &mapped,
                unpadded_bytes_per_row as usize,
                padded_bytes_per_row as usize,
                bytemuck::cast_slice_mut(out),
            );
        }
        buffer.unmap();
        Ok(())
    }
}

fn padded_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn copy_tight_rows(padded: &[u8], row_bytes: usize, padded_row_bytes: usize, out: &mut [u8]) {
    for (row, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
        let start = row * padded_row_bytes;
        dst.copy_from_slice(&padded[start..start + row_bytes]);
    }
}

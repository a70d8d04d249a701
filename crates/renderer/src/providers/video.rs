use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::imageops::flip_vertical_in_place;
use image::DynamicImage;

use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::{PixelBuffer, PixelFormat, TextureSource, UniformDescriptor};

/// Publishes the most recent video frame as the `camera` texture.
///
/// Frames are stored bottom row first so texture coordinates match the GL
/// convention used by the programs.
pub struct VideoProvider {
    hub: SnapshotHub,
}

impl VideoProvider {
    pub fn new() -> Self {
        Self {
            hub: SnapshotHub::new(descriptors(PixelBuffer::blank(1, 1))),
        }
    }

    pub fn push_frame(&self, frame: PixelBuffer) {
        self.hub.publish(descriptors(frame));
    }

    pub fn push_image(&self, image: &DynamicImage) {
        let mut rgba = image.to_rgba8();
        flip_vertical_in_place(&mut rgba);
        let (width, height) = rgba.dimensions();
        if let Some(frame) = PixelBuffer::new(width, height, PixelFormat::Rgba8, rgba.into_raw()) {
            self.push_frame(frame);
        }
    }

    pub fn push_file(&self, path: &Path) -> Result<()> {
        let image = image::open(path)
            .with_context(|| format!("failed to open video frame {}", path.display()))?;
        self.push_image(&image);
        Ok(())
    }
}

impl Default for VideoProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn descriptors(frame: PixelBuffer) -> Vec<UniformDescriptor> {
    vec![UniformDescriptor::texture(
        "camera",
        TextureSource::Pixels(Arc::new(frame)),
    )]
}

impl PropertyProvider for VideoProvider {
    fn name(&self) -> &str {
        "video"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}

use std::sync::Arc;

use crate::audio::{AudioEvent, AudioSink};
use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::{PixelBuffer, PixelFormat, TextureSource, UniformDescriptor};

/// Packs each audio tick into an `fft_size × 1` RGBA8 texture named
/// `audioTexture`: spectrum in R, waveform in G, alpha opaque.
pub struct SpectrumProvider {
    fft_size: usize,
    hub: SnapshotHub,
}

impl SpectrumProvider {
    pub fn new(fft_size: usize) -> Self {
        let blank = PixelBuffer::blank(fft_size as u32, 1);
        Self {
            fft_size,
            hub: SnapshotHub::new(descriptors(blank)),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

fn descriptors(pixels: PixelBuffer) -> Vec<UniformDescriptor> {
    vec![UniformDescriptor::texture(
        "audioTexture",
        TextureSource::Pixels(Arc::new(pixels)),
    )]
}

fn pack(fft_size: usize, event: &AudioEvent) -> Option<PixelBuffer> {
    let mut data = vec![0u8; fft_size * 4];
    for (index, texel) in data.chunks_exact_mut(4).enumerate() {
        texel[0] = event.frequency.get(index).copied().unwrap_or(0);
        texel[1] = event.time_domain.get(index).copied().unwrap_or(128);
        texel[3] = u8::MAX;
    }
    PixelBuffer::new(fft_size as u32, 1, PixelFormat::Rgba8, data)
}

impl AudioSink for SpectrumProvider {
    fn on_audio(&self, event: &AudioEvent) {
        if let Some(pixels) = pack(self.fft_size, event) {
            self.hub.publish(descriptors(pixels));
        }
    }
}

impl PropertyProvider for SpectrumProvider {
    fn name(&self) -> &str {
        "audio"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::UniformDescriptor;

/// Publishes seconds since start as `time`, starting at zero.
pub struct TimeProvider {
    hub: SnapshotHub,
    started: Mutex<Instant>,
}

impl TimeProvider {
    pub fn new() -> Self {
        Self {
            hub: SnapshotHub::new(descriptors(0.0)),
            started: Mutex::new(Instant::now()),
        }
    }

    /// Publishes the wall-clock time elapsed since construction or the last
    /// [`reset`](Self::reset) and returns it.
    pub fn tick(&self) -> f32 {
        let seconds = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
            .as_secs_f32();
        self.set_seconds(seconds);
        seconds
    }

    pub fn set_seconds(&self, seconds: f32) {
        self.hub.publish(descriptors(seconds));
    }

    pub fn reset(&self) {
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.set_seconds(0.0);
    }
}

impl Default for TimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn descriptors(seconds: f32) -> Vec<UniformDescriptor> {
    vec![UniformDescriptor::scalar("time", seconds)]
}

impl PropertyProvider for TimeProvider {
    fn name(&self) -> &str {
        "time"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}

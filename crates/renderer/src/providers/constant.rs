use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::UniformDescriptor;

/// Publishes caller-supplied descriptors whenever [`set`](Self::set) runs.
pub struct ConstantProvider {
    name: String,
    hub: SnapshotHub,
}

impl ConstantProvider {
    pub fn new(name: impl Into<String>, descriptors: Vec<UniformDescriptor>) -> Self {
        Self {
            name: name.into(),
            hub: SnapshotHub::new(descriptors),
        }
    }

    pub fn set(&self, descriptors: Vec<UniformDescriptor>) {
        self.hub.publish(descriptors);
    }
}

impl PropertyProvider for ConstantProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}

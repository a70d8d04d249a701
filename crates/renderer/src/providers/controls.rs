use std::sync::{Mutex, PoisonError};

use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::UniformDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub struct ControlParameter {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub current: f32,
}

impl ControlParameter {
    pub fn new(name: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        let mut parameter = Self {
            name: name.into(),
            min,
            max,
            default,
            current: default,
        };
        parameter.current = parameter.clamp(default);
        parameter
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }
}

/// Named scalar controls, each published as a float uniform.
pub struct ControlsProvider {
    parameters: Mutex<Vec<ControlParameter>>,
    hub: SnapshotHub,
}

impl ControlsProvider {
    pub fn new(parameters: Vec<ControlParameter>) -> Self {
        let hub = SnapshotHub::new(descriptors(&parameters));
        Self {
            parameters: Mutex::new(parameters),
            hub,
        }
    }

    /// Clamps `value` into the control's range, publishes it and returns the
    /// stored value. Unknown names are ignored.
    pub fn set(&self, name: &str, value: f32) -> Option<f32> {
        let mut parameters = self.parameters.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(parameter) = parameters.iter_mut().find(|p| p.name == name) else {
            tracing::warn!(control = name, "ignoring update for unknown control");
            return None;
        };
        let clamped = parameter.clamp(value);
        if clamped != value {
            tracing::debug!(control = name, requested = value, clamped, "control value clamped");
        }
        parameter.current = clamped;
        self.hub.publish(descriptors(&parameters));
        Some(clamped)
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        self.parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.current)
    }

    pub fn value_or(&self, name: &str, fallback: f32) -> f32 {
        self.value(name).unwrap_or(fallback)
    }

    pub fn parameters(&self) -> Vec<ControlParameter> {
        self.parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        let mut parameters = self.parameters.lock().unwrap_or_else(PoisonError::into_inner);
        for parameter in parameters.iter_mut() {
            parameter.current = parameter.clamp(parameter.default);
        }
        self.hub.publish(descriptors(&parameters));
    }
}

fn descriptors(parameters: &[ControlParameter]) -> Vec<UniformDescriptor> {
    parameters
        .iter()
        .map(|p| UniformDescriptor::scalar(p.name.clone(), p.current))
        .collect()
}

impl PropertyProvider for ControlsProvider {
    fn name(&self) -> &str {
        "controls"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}

use bytemuck::{Pod, Zeroable};

use crate::audio::AudioFeatures;
use crate::providers::ControlsProvider;

/// Control names read by the velocity program, with their defaults.
pub const FLOCKING_CONTROLS: [(&str, f32); 5] = [
    ("separationDistance", 12.0),
    ("alignmentDistance", 12.0),
    ("cohesionDistance", 12.0),
    ("roamingDistance", 96.0),
    ("speed", 3.0),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockingControls {
    pub separation_distance: f32,
    pub alignment_distance: f32,
    pub cohesion_distance: f32,
    pub roaming_distance: f32,
    pub speed: f32,
}

impl Default for FlockingControls {
    fn default() -> Self {
        let [separation, alignment, cohesion, roaming, speed] = FLOCKING_CONTROLS.map(|(_, v)| v);
        Self {
            separation_distance: separation,
            alignment_distance: alignment,
            cohesion_distance: cohesion,
            roaming_distance: roaming,
            speed,
        }
    }
}

impl FlockingControls {
    /// Current values from `controls`, falling back to defaults per name.
    pub fn from_provider(controls: &ControlsProvider) -> Self {
        let [separation, alignment, cohesion, roaming, speed] =
            FLOCKING_CONTROLS.map(|(name, default)| controls.value_or(name, default));
        Self {
            separation_distance: separation,
            alignment_distance: alignment,
            cohesion_distance: cohesion,
            roaming_distance: roaming,
            speed,
        }
    }
}

/// std140 mirror of the `FlockingParams` block injected into every program.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct FlockingUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub delta: f32,
    pub eqs: [f32; 3],
    pub loudness: f32,
    pub accumulated_loudness: f32,
    pub beat: f32,
    pub separation_distance: f32,
    pub alignment_distance: f32,
    pub cohesion_distance: f32,
    pub roaming_distance: f32,
    pub speed: f32,
    pub freedom_factor: f32,
}

impl FlockingUniforms {
    pub fn new(
        width: u32,
        time: f32,
        delta: f32,
        features: &AudioFeatures,
        controls: &FlockingControls,
        freedom_factor: f32,
    ) -> Self {
        Self {
            resolution: [width as f32, width as f32],
            time,
            delta,
            eqs: features.eqs,
            loudness: features.loudness,
            accumulated_loudness: features.accumulated_loudness,
            beat: features.beat,
            separation_distance: controls.separation_distance,
            alignment_distance: controls.alignment_distance,
            cohesion_distance: controls.cohesion_distance,
            roaming_distance: controls.roaming_distance,
            speed: controls.speed,
            freedom_factor,
        }
    }
}

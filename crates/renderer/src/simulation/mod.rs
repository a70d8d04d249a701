//! GPU feedback flocking simulation.
//!
//! Types:
//!
//! - `SlotId`/`SurfaceArena` name the four off-screen surfaces (position and
//!   velocity, sides A and B); `FlipFlop` selects which side is readable.
//! - `SimulationBackend` is the seam to the GPU. The engine only talks to it
//!   in terms of slots, so the scheduling rules are testable on the CPU.
//! - `FlockingSimulation` owns the surfaces and the three programs and runs
//!   velocity then position every step.
//! - `SimulationProvider` republishes the committed position surface as the
//!   `texturePosition` uniform.
//!
//! Functions:
//!
//! - `seed_textures` fills the initial position/velocity data.
//! - `point_references` builds per-point texel lookups for the point cloud.
mod arena;
mod backend;
mod engine;
mod params;
mod points;
mod provider;
mod seed;

pub use arena::{Channel, FlipFlop, FramePlan, Side, SlotId, SurfaceArena};
pub use backend::{PassInputs, ProgramKind, SimulationBackend, TextureRef};
pub use engine::{
    FlockingSimulation, ProgramFutures, SimulationError, SimulationSettings, StepOutcome,
};
pub use params::{FlockingControls, FlockingUniforms, FLOCKING_CONTROLS};
pub use points::{point_references, PointReference, POINT_VERTICES};
pub use provider::SimulationProvider;
pub use seed::{seed_textures, SeedTexture, SeedTextures};

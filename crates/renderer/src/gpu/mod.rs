//! Headless wgpu backend for the flocking simulation.
//!
//! Types:
//!
//! - [`WgpuBackend`] owns the device, the four RGBA32F surfaces, the seed
//!   textures and the shared uniform buffer.
//! - [`AdapterProfile`] summarises the adapter that was selected.
//!
//! Every pass draws a full-screen triangle. Set 0 carries the
//! `FlockingParams` block; set 1 carries the position and velocity inputs and
//! a nearest sampler, because RGBA32F cannot be filtered on every adapter.

mod backend;
mod context;
mod pipeline;
mod targets;

pub use backend::WgpuBackend;
pub use context::AdapterProfile;
pub use pipeline::SimulationPipeline;

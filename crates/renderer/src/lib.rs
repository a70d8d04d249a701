//! Renderer crate for glvis.
//!
//! Providers publish uniform snapshots; the aggregator folds them into one
//! table per subscriber; the shader plane prepends declarations for that table
//! to the loaded fragment source. The flocking simulation runs beside it on a
//! [`SimulationBackend`] and feeds its committed position surface back in as
//! the `texturePosition` uniform.
//!
//! ```text
//!   AudioManager ──▶ Spectrum / Loudness providers ─┐
//!   Time / Resolution / Controls / Video providers ─┼─▶ UniformAggregator ─▶ ReactiveShaderPlane ─▶ PlaneMesh
//!   FlockingSimulation ──▶ SimulationProvider ──────┘                                ▲
//!          │                                                                        │
//!          └─▶ WgpuBackend (RGBA32F ping-pong surfaces)       ShaderTextLoader ─────┘
//! ```
//!
//! The GPU backend is headless; presenting the plane is left to the caller.

pub mod aggregator;
pub mod audio;
mod compile;
pub mod gpu;
pub mod plane;
pub mod provider;
pub mod providers;
pub mod signal;
pub mod simulation;
pub mod types;

pub use aggregator::{UniformAggregator, UniformMap, UniformStream};
pub use audio::{AudioEvent, AudioFeatures, AudioManager, AudioSink, FFT_SIZE};
pub use compile::wrap_simulation_fragment;
pub use gpu::{AdapterProfile, WgpuBackend};
pub use plane::{compose, PlaneError, PlaneGeometry, PlaneMaterial, PlaneMesh, ReactiveShaderPlane};
pub use provider::{PropertyProvider, ProviderEvent, Snapshot, SnapshotHub, SnapshotSink};
pub use signal::{Publisher, Subscription};
pub use simulation::{
    FlockingSimulation, ProgramFutures, SimulationBackend, SimulationError, SimulationSettings,
    StepOutcome,
};
pub use types::{
    PixelBuffer, PixelFormat, TextureSource, UniformDescriptor, UniformKind, UniformValue,
};

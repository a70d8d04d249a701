//! Concrete [`PropertyProvider`](crate::PropertyProvider)s.
//!
//! | provider             | uniforms                                   |
//! |----------------------|--------------------------------------------|
//! | `ResolutionProvider` | `resolution` (vec2)                        |
//! | `TimeProvider`       | `time` (float, seconds)                    |
//! | `SpectrumProvider`   | `audioTexture` (sampler2D)                 |
//! | `LoudnessProvider`   | `loudness`, `accumulatedLoudness` (float)  |
//! | `ControlsProvider`   | one float per control parameter            |
//! | `VideoProvider`      | `camera` (sampler2D)                       |
//! | `ConstantProvider`   | whatever the caller sets                   |
mod constant;
mod controls;
mod loudness;
mod resolution;
mod spectrum;
mod time;
mod video;

pub use constant::ConstantProvider;
pub use controls::{ControlParameter, ControlsProvider};
pub use loudness::LoudnessProvider;
pub use resolution::ResolutionProvider;
pub use spectrum::SpectrumProvider;
pub use time::TimeProvider;
pub use video::VideoProvider;

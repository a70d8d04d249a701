use anyhow::Result;
use shaderload::ShaderText;

use super::{Channel, FlockingUniforms, SeedTexture, SlotId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Copies its source texture; used to rasterize the seed.
    Texture,
    Velocity,
    Position,
}

impl ProgramKind {
    pub fn fragment_program(self) -> &'static str {
        match self {
            ProgramKind::Texture => "flocking/texture",
            ProgramKind::Velocity => "flocking/velocity",
            ProgramKind::Position => "flocking/position",
        }
    }
}

/// A texture a pass samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRef {
    Seed(Channel),
    Slot(SlotId),
}

/// What a pass binds as `texturePosition` and `textureVelocity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassInputs {
    pub position: TextureRef,
    pub velocity: TextureRef,
}

impl PassInputs {
    /// Binds `source` to both inputs, as the texture program expects.
    pub fn single(source: TextureRef) -> Self {
        Self {
            position: source,
            velocity: source,
        }
    }

    pub fn reads(&self, slot: SlotId) -> bool {
        self.position == TextureRef::Slot(slot) || self.velocity == TextureRef::Slot(slot)
    }
}

/// GPU operations the simulation needs. Implementations own the surfaces;
/// the engine refers to them by [`SlotId`] only.
pub trait SimulationBackend {
    type Program;

    fn compile(&mut self, kind: ProgramKind, text: &ShaderText) -> Result<Self::Program>;

    /// Creates the RGBA32F surface for `slot`.
    fn allocate(&mut self, slot: SlotId, width: u32, height: u32) -> Result<()>;

    fn upload_seed(&mut self, channel: Channel, seed: &SeedTexture) -> Result<()>;

    /// Renders one full-screen pass of `program` into `target`.
    fn draw(
        &mut self,
        program: &Self::Program,
        inputs: PassInputs,
        target: SlotId,
        uniforms: &FlockingUniforms,
    ) -> Result<()>;

    /// Copies the texels of `slot` into `out`, four floats per texel.
    fn read_back(&mut self, slot: SlotId, out: &mut [f32]) -> Result<()>;
}

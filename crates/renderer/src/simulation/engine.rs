use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use shaderload::{LoadError, ShaderFuture, ShaderText, ShaderTextLoader};
use thiserror::Error;

use crate::audio::AudioFeatures;

use super::{
    seed_textures, Channel, FlipFlop, FlockingControls, FlockingUniforms, PassInputs,
    ProgramKind, SimulationBackend, SimulationProvider, SlotId, TextureRef,
};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("failed to load simulation program: {0}")]
    Load(#[from] LoadError),
    #[error("pass would read and write surface {0}")]
    SelfReference(SlotId),
    #[error("simulation texture width must be greater than zero")]
    EmptyTexture,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub texture_width: u32,
    pub cube_size: f32,
    pub freedom_factor: f32,
    pub seed: Option<u64>,
    pub readback: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            texture_width: 64,
            cube_size: 128.0,
            freedom_factor: 5.0,
            seed: None,
            readback: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Programs still loading; nothing was drawn.
    Skipped,
    Advanced { frame: u64 },
    /// A program failed to load earlier; the engine no longer steps.
    Halted,
}

/// Eventual texts of the three simulation programs.
#[derive(Debug)]
pub struct ProgramFutures {
    pub texture: ShaderFuture,
    pub velocity: ShaderFuture,
    pub position: ShaderFuture,
}

impl ProgramFutures {
    /// Velocity and position borrow the texture program's vertex source.
    pub fn load(loader: &ShaderTextLoader) -> Self {
        let vertex = ProgramKind::Texture.fragment_program();
        Self {
            texture: loader.load(vertex),
            velocity: loader.load_varied(ProgramKind::Velocity.fragment_program(), vertex),
            position: loader.load_varied(ProgramKind::Position.fragment_program(), vertex),
        }
    }

    fn poll(&mut self) -> Result<Option<[ShaderText; 3]>, LoadError> {
        let texture = self.texture.poll()?;
        let velocity = self.velocity.poll()?;
        let position = self.position.poll()?;
        Ok(match (texture, velocity, position) {
            (Some(texture), Some(velocity), Some(position)) => Some([texture, velocity, position]),
            _ => None,
        })
    }
}

struct Programs<P> {
    velocity: P,
    position: P,
}

enum EngineState<P> {
    Loading(ProgramFutures),
    Ready(Programs<P>),
    Halted,
}

pub struct FlockingSimulation<B: SimulationBackend> {
    backend: B,
    settings: SimulationSettings,
    state: EngineState<B::Program>,
    flip: FlipFlop,
    last_time: f32,
    delta: f32,
    frame: u64,
    mirror: Option<Vec<f32>>,
    provider: Option<Arc<SimulationProvider>>,
}

impl<B: SimulationBackend> FlockingSimulation<B> {
    /// Allocates the four surfaces; programs are compiled once `programs`
    /// resolve.
    pub fn new(
        mut backend: B,
        settings: SimulationSettings,
        programs: ProgramFutures,
    ) -> Result<Self, SimulationError> {
        let width = settings.texture_width;
        if width == 0 {
            return Err(SimulationError::EmptyTexture);
        }
        for slot in SlotId::ALL {
            backend.allocate(slot, width, width)?;
        }
        tracing::debug!(width, readback = settings.readback, "allocated simulation surfaces");

        let mirror = settings
            .readback
            .then(|| vec![0.0; width as usize * width as usize * 4]);
        Ok(Self {
            backend,
            settings,
            state: EngineState::Loading(programs),
            flip: FlipFlop::new(),
            last_time: 0.0,
            delta: 0.0,
            frame: 0,
            mirror,
            provider: None,
        })
    }

    /// Publishes the committed position surface after every step.
    pub fn attach_provider(&mut self, provider: Arc<SimulationProvider>) {
        self.provider = Some(provider);
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    pub fn flip_flop(&self) -> FlipFlop {
        self.flip
    }

    /// The position surface holding the latest completed frame.
    pub fn committed_position(&self) -> SlotId {
        SlotId::new(Channel::Position, self.flip.readable())
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// CPU copy of the committed position surface, when readback is enabled.
    pub fn mirror(&self) -> Option<&[f32]> {
        self.mirror.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Advances one frame at `now` seconds. Returns `Skipped` while programs
    /// are still loading; a load, compile or seeding failure is returned once,
    /// after which every step reports `Halted`.
    pub fn step(
        &mut self,
        now: f32,
        features: &AudioFeatures,
        controls: &FlockingControls,
    ) -> Result<StepOutcome, SimulationError> {
        self.delta = now - self.last_time;
        self.last_time = now;

        if let EngineState::Loading(futures) = &mut self.state {
            match futures.poll() {
                Ok(None) => {
                    tracing::trace!("simulation programs not loaded; skipping step");
                    return Ok(StepOutcome::Skipped);
                }
                Ok(Some(texts)) => match self.initialise(texts) {
                    Ok(programs) => self.state = EngineState::Ready(programs),
                    Err(err) => {
                        tracing::warn!(error = %err, "simulation setup failed; halting");
                        self.state = EngineState::Halted;
                        return Err(err);
                    }
                },
                Err(err) => {
                    tracing::warn!(error = %err, "simulation program failed to load; halting");
                    self.state = EngineState::Halted;
                    return Err(err.into());
                }
            }
        }

        let EngineState::Ready(programs) = &self.state else {
            return Ok(StepOutcome::Halted);
        };

        let uniforms = FlockingUniforms::new(
            self.settings.texture_width,
            now,
            self.delta,
            features,
            controls,
            self.settings.freedom_factor,
        );
        let plan = self.flip.plan();

        let velocity_target = plan.write(Channel::Velocity);
        draw(
            &mut self.backend,
            &programs.velocity,
            PassInputs {
                position: TextureRef::Slot(plan.read(Channel::Position)),
                velocity: TextureRef::Slot(plan.read(Channel::Velocity)),
            },
            velocity_target,
            &uniforms,
        )?;

        let position_target = plan.write(Channel::Position);
        draw(
            &mut self.backend,
            &programs.position,
            PassInputs {
                position: TextureRef::Slot(plan.read(Channel::Position)),
                velocity: TextureRef::Slot(velocity_target),
            },
            position_target,
            &uniforms,
        )?;

        if let Some(mirror) = self.mirror.as_mut() {
            self.backend.read_back(position_target, mirror)?;
        }

        self.flip.flip();
        self.frame += 1;
        if let Some(provider) = &self.provider {
            provider.update(self.committed_position(), self.delta);
        }
        tracing::trace!(frame = self.frame, delta = self.delta, "simulation advanced");
        Ok(StepOutcome::Advanced { frame: self.frame })
    }

    /// Compiles the programs and rasterizes the seed into both sides of each
    /// channel.
    fn initialise(&mut self, texts: [ShaderText; 3]) -> Result<Programs<B::Program>, SimulationError> {
        let [texture_text, velocity_text, position_text] = texts;
        let texture = self.backend.compile(ProgramKind::Texture, &texture_text)?;
        let velocity = self.backend.compile(ProgramKind::Velocity, &velocity_text)?;
        let position = self.backend.compile(ProgramKind::Position, &position_text)?;

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds = seed_textures(self.settings.texture_width, self.settings.cube_size, &mut rng);

        let uniforms = FlockingUniforms::new(
            self.settings.texture_width,
            0.0,
            0.0,
            &AudioFeatures::default(),
            &FlockingControls::default(),
            self.settings.freedom_factor,
        );
        let plan = self.flip.plan();
        for channel in [Channel::Position, Channel::Velocity] {
            self.backend.upload_seed(channel, seeds.get(channel))?;
            let first = plan.read(channel);
            draw(
                &mut self.backend,
                &texture,
                PassInputs::single(TextureRef::Seed(channel)),
                first,
                &uniforms,
            )?;
            draw(
                &mut self.backend,
                &texture,
                PassInputs::single(TextureRef::Slot(first)),
                plan.write(channel),
                &uniforms,
            )?;
        }

        if let Some(mirror) = self.mirror.as_mut() {
            mirror.copy_from_slice(&seeds.position.data);
        }
        tracing::info!(
            width = self.settings.texture_width,
            points = self.settings.texture_width * self.settings.texture_width,
            "flocking simulation initialised"
        );
        Ok(Programs { velocity, position })
    }
}

fn draw<B: SimulationBackend>(
    backend: &mut B,
    program: &B::Program,
    inputs: PassInputs,
    target: SlotId,
    uniforms: &FlockingUniforms,
) -> Result<(), SimulationError> {
    if inputs.reads(target) {
        return Err(SimulationError::SelfReference(target));
    }
    backend.draw(program, inputs, target, uniforms)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use shaderload::ShaderPromise;

    use super::*;
    use crate::simulation::{SeedTexture, Side};

    #[derive(Debug, Clone, PartialEq)]
    struct DrawCall {
        program: ProgramKind,
        inputs: PassInputs,
        target: SlotId,
        delta: f32,
    }

    #[derive(Debug, Default)]
    struct RecordingBackend {
        allocated: Vec<(SlotId, u32, u32)>,
        seeds: Vec<Channel>,
        draws: Vec<DrawCall>,
        reads: Vec<SlotId>,
        compiles: usize,
        reject: Option<ProgramKind>,
    }

    impl SimulationBackend for RecordingBackend {
        type Program = ProgramKind;

        fn compile(&mut self, kind: ProgramKind, _text: &ShaderText) -> anyhow::Result<ProgramKind> {
            self.compiles += 1;
            if self.reject == Some(kind) {
                anyhow::bail!("bad glsl");
            }
            Ok(kind)
        }

        fn allocate(&mut self, slot: SlotId, width: u32, height: u32) -> anyhow::Result<()> {
            self.allocated.push((slot, width, height));
            Ok(())
        }

        fn upload_seed(&mut self, channel: Channel, _seed: &SeedTexture) -> anyhow::Result<()> {
            self.seeds.push(channel);
            Ok(())
        }

        fn draw(
            &mut self,
            program: &ProgramKind,
            inputs: PassInputs,
            target: SlotId,
            uniforms: &FlockingUniforms,
        ) -> anyhow::Result<()> {
            self.draws.push(DrawCall {
                program: *program,
                inputs,
                target,
                delta: uniforms.delta,
            });
            Ok(())
        }

        fn read_back(&mut self, slot: SlotId, out: &mut [f32]) -> anyhow::Result<()> {
            self.reads.push(slot);
            out.fill(slot.index() as f32);
            Ok(())
        }
    }

    fn ready_programs() -> ProgramFutures {
        ProgramFutures {
            texture: ShaderFuture::ready(ShaderText::new("// texture", "// vertex")),
            velocity: ShaderFuture::ready(ShaderText::new("// velocity", "// vertex")),
            position: ShaderFuture::ready(ShaderText::new("// position", "// vertex")),
        }
    }

    fn settings() -> SimulationSettings {
        SimulationSettings {
            seed: Some(5),
            ..SimulationSettings::default()
        }
    }

    fn slot(channel: Channel, side: Side) -> SlotId {
        SlotId::new(channel, side)
    }

    fn step(sim: &mut FlockingSimulation<RecordingBackend>, now: f32) -> StepOutcome {
        sim.step(now, &AudioFeatures::default(), &FlockingControls::default())
            .unwrap()
    }

    #[test]
    fn allocates_four_surfaces_up_front() {
        let sim = FlockingSimulation::new(RecordingBackend::default(), settings(), ready_programs())
            .unwrap();
        assert_eq!(sim.backend().allocated.len(), 4);
        assert!(sim.backend().allocated.iter().all(|(_, w, h)| (*w, *h) == (64, 64)));
    }

    #[test]
    fn step_is_silent_until_programs_load() {
        let (promise, texture): (ShaderPromise, _) = ShaderFuture::pending();
        let programs = ProgramFutures {
            texture,
            ..ready_programs()
        };
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings(), programs).unwrap();

        assert_eq!(step(&mut sim, 0.016), StepOutcome::Skipped);
        assert!(sim.backend().draws.is_empty());
        assert!(sim.flip_flop().generation());

        promise.resolve(Ok(ShaderText::new("// texture", "// vertex")));
        assert_eq!(step(&mut sim, 0.032), StepOutcome::Advanced { frame: 1 });
        assert!(sim.is_ready());
    }

    #[test]
    fn warm_up_copies_seed_into_both_sides() {
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings(), ready_programs())
                .unwrap();
        step(&mut sim, 0.0);

        let warm: Vec<_> = sim.backend().draws[..4].to_vec();
        assert!(warm.iter().all(|call| call.program == ProgramKind::Texture));
        assert_eq!(
            warm.iter().map(|call| call.target).collect::<Vec<_>>(),
            vec![
                slot(Channel::Position, Side::A),
                slot(Channel::Position, Side::B),
                slot(Channel::Velocity, Side::A),
                slot(Channel::Velocity, Side::B),
            ]
        );
        assert_eq!(warm[0].inputs, PassInputs::single(TextureRef::Seed(Channel::Position)));
        assert_eq!(sim.backend().seeds, vec![Channel::Position, Channel::Velocity]);
    }

    #[test]
    fn one_cycle_on_64_by_64_writes_one_surface_per_channel() {
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings(), ready_programs())
                .unwrap();
        assert!(sim.flip_flop().generation());
        step(&mut sim, 0.016);

        let frame: Vec<_> = sim.backend().draws[4..].to_vec();
        assert_eq!(frame.len(), 2);
        assert_eq!(
            frame[0],
            DrawCall {
                program: ProgramKind::Velocity,
                inputs: PassInputs {
                    position: TextureRef::Slot(slot(Channel::Position, Side::A)),
                    velocity: TextureRef::Slot(slot(Channel::Velocity, Side::A)),
                },
                target: slot(Channel::Velocity, Side::B),
                delta: 0.016,
            }
        );
        assert_eq!(frame[1].program, ProgramKind::Position);
        assert_eq!(
            frame[1].inputs,
            PassInputs {
                position: TextureRef::Slot(slot(Channel::Position, Side::A)),
                velocity: TextureRef::Slot(slot(Channel::Velocity, Side::B)),
            }
        );
        assert_eq!(frame[1].target, slot(Channel::Position, Side::B));

        assert!(!sim.flip_flop().generation());
        assert_eq!(sim.committed_position(), slot(Channel::Position, Side::B));
        assert_eq!(sim.backend().reads, vec![slot(Channel::Position, Side::B)]);
        assert_eq!(sim.mirror().unwrap().len(), 64 * 64 * 4);
    }

    #[test]
    fn velocity_precedes_position_and_never_reads_its_target() {
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings(), ready_programs())
                .unwrap();
        for frame in 1..=6 {
            step(&mut sim, frame as f32 * 0.016);
        }

        let frames: Vec<_> = sim.backend().draws[4..].chunks(2).map(<[_]>::to_vec).collect();
        assert_eq!(frames.len(), 6);
        for (index, pair) in frames.iter().enumerate() {
            assert_eq!(pair[0].program, ProgramKind::Velocity);
            assert_eq!(pair[1].program, ProgramKind::Position);
            for call in pair {
                assert!(!call.inputs.reads(call.target));
            }
            let expected = if index % 2 == 0 { Side::B } else { Side::A };
            assert_eq!(pair[1].target.side, expected);
        }
    }

    #[test]
    fn readback_can_be_disabled() {
        let settings = SimulationSettings {
            readback: false,
            ..settings()
        };
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings, ready_programs())
                .unwrap();
        step(&mut sim, 0.016);
        assert!(sim.backend().reads.is_empty());
        assert!(sim.mirror().is_none());
    }

    #[test]
    fn load_failure_is_reported_once_then_halts() {
        let programs = ProgramFutures {
            velocity: ShaderFuture::Failed(LoadError::FragmentMissing {
                program: "flocking/velocity".into(),
                location: "mem://flocking/velocity.frag".into(),
            }),
            ..ready_programs()
        };
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings(), programs).unwrap();

        let err = sim
            .step(0.016, &AudioFeatures::default(), &FlockingControls::default())
            .unwrap_err();
        assert!(matches!(err, SimulationError::Load(_)));
        assert_eq!(step(&mut sim, 0.032), StepOutcome::Halted);
        assert!(sim.backend().draws.is_empty());
    }

    #[test]
    fn compile_failure_is_reported_once_then_halts() {
        let backend = RecordingBackend {
            reject: Some(ProgramKind::Position),
            ..RecordingBackend::default()
        };
        let mut sim = FlockingSimulation::new(backend, settings(), ready_programs()).unwrap();

        let err = sim
            .step(0.016, &AudioFeatures::default(), &FlockingControls::default())
            .unwrap_err();
        assert!(matches!(err, SimulationError::Backend(_)));
        assert_eq!(step(&mut sim, 0.032), StepOutcome::Halted);
        assert_eq!(step(&mut sim, 0.048), StepOutcome::Halted);

        assert_eq!(sim.backend().compiles, 3);
        assert!(sim.backend().seeds.is_empty());
        assert!(sim.backend().draws.is_empty());
        assert!(!sim.is_ready());
    }

    #[test]
    fn provider_tracks_committed_surface() {
        use crate::provider::PropertyProvider;
        use crate::types::{TextureSource, UniformValue};

        let provider = Arc::new(SimulationProvider::new());
        let mut sim =
            FlockingSimulation::new(RecordingBackend::default(), settings(), ready_programs())
                .unwrap();
        sim.attach_provider(provider.clone());
        step(&mut sim, 0.5);

        let snapshot = provider.snapshot();
        assert_eq!(
            snapshot[0].value,
            UniformValue::Texture(TextureSource::Surface(slot(Channel::Position, Side::B)))
        );
        assert_eq!(snapshot[1].as_scalar(), Some(0.5));
    }

    #[test]
    fn rejects_empty_texture() {
        let settings = SimulationSettings {
            texture_width: 0,
            ..settings()
        };
        assert!(matches!(
            FlockingSimulation::new(RecordingBackend::default(), settings, ready_programs()),
            Err(SimulationError::EmptyTexture)
        ));
    }
}

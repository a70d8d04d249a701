use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use renderer::audio::AudioAnalyser;
use renderer::providers::{ControlsProvider, LoudnessProvider, SpectrumProvider};
use renderer::simulation::{FlockingControls, SimulationProvider};
use renderer::{
    AudioEvent, AudioManager, AudioSink, FlockingSimulation, ProgramFutures, SimulationSettings,
    StepOutcome, WgpuBackend,
};
use serde::Serialize;
use visconfig::VisConfig;

use crate::cli::SimulateArgs;
use crate::run::{build_loader, control_parameters};

/// How long to wait for the three simulation programs to arrive.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const LOAD_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Serialize)]
struct SimulationReport {
    adapter: String,
    frames: u64,
    texture_width: u32,
    delta: f32,
    loudness: f32,
    accumulated_loudness: f32,
    positions: Option<PositionStats>,
}

#[derive(Debug, Serialize, PartialEq)]
struct PositionStats {
    points: usize,
    non_finite: usize,
    centroid: [f32; 3],
    min: [f32; 3],
    max: [f32; 3],
}

pub fn run(config: &VisConfig, args: SimulateArgs) -> Result<()> {
    let loader = build_loader(config)?;
    let fft_size = config.audio.fft_size;
    let interval = config.audio.sample_interval;
    let settings = SimulationSettings {
        texture_width: config.simulation.texture_width,
        cube_size: config.simulation.cube_size,
        freedom_factor: config.simulation.freedom_factor,
        seed: args.seed.or(config.simulation.seed),
        readback: config.simulation.readback && !args.no_readback,
    };

    let backend = WgpuBackend::new()?;
    let adapter = backend.adapter_profile().name.clone();
    tracing::info!(%adapter, width = settings.texture_width, "starting headless simulation");

    let mut simulation = FlockingSimulation::new(backend, settings, ProgramFutures::load(&loader))?;
    simulation.attach_provider(Arc::new(SimulationProvider::new()));

    let controls = Arc::new(ControlsProvider::new(control_parameters(config)));
    let loudness = Arc::new(LoudnessProvider::new(Some(Arc::clone(&controls))));
    let mut audio = AudioManager::new(fft_size);
    audio.register(Arc::clone(&loudness) as Arc<dyn AudioSink>);
    audio.register(Arc::new(SpectrumProvider::new(fft_size)) as Arc<dyn AudioSink>);
    let mut feed = match &args.audio {
        Some(path) => AudioFeed::from_wav(path, fft_size, interval)?,
        None => AudioFeed::Silent { fft_size },
    };

    let flocking = FlockingControls::from_provider(&controls);
    let deadline = Instant::now() + LOAD_TIMEOUT;
    let mut clock = FrameClock::new(interval);
    let mut fed = false;
    let mut advanced = 0;
    while advanced < args.frames {
        if !fed {
            audio.dispatch(&feed.next_event());
            fed = true;
        }
        let now = clock.now(advanced);
        match simulation.step(now, &loudness.features(), &flocking)? {
            StepOutcome::Skipped => {
                if Instant::now() >= deadline {
                    bail!("simulation programs did not load within {LOAD_TIMEOUT:?}");
                }
                let waiting = Instant::now();
                thread::sleep(LOAD_POLL);
                clock.waited(waiting.elapsed());
            }
            StepOutcome::Advanced { frame } => {
                advanced = frame;
                fed = false;
            }
            StepOutcome::Halted => bail!("simulation halted"),
        }
    }

    let features = loudness.features();
    let report = SimulationReport {
        adapter,
        frames: simulation.frame(),
        texture_width: config.simulation.texture_width,
        delta: simulation.delta(),
        loudness: features.loudness,
        accumulated_loudness: features.accumulated_loudness,
        positions: simulation.mirror().map(position_stats),
    };
    print_report(&report, args.json)
}

/// Simulation time: one sample interval per advanced frame, plus the
/// wall-clock time spent waiting for programs.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    interval: f32,
    waited: f32,
}

impl FrameClock {
    fn new(interval: Duration) -> Self {
        Self {
            interval: interval.as_secs_f32(),
            waited: 0.0,
        }
    }

    fn now(&self, advanced: u64) -> f32 {
        self.waited + (advanced + 1) as f32 * self.interval
    }

    fn waited(&mut self, elapsed: Duration) {
        self.waited += elapsed.as_secs_f32();
    }
}

fn print_report(report: &SimulationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("adapter:      {}", report.adapter);
    println!("frames:       {}", report.frames);
    println!("texture:      {0}x{0}", report.texture_width);
    println!("delta:        {:.4}", report.delta);
    println!(
        "loudness:     {:.3} (accumulated {:.3})",
        report.loudness, report.accumulated_loudness
    );
    match &report.positions {
        Some(stats) => {
            println!("points:       {} ({} non-finite)", stats.points, stats.non_finite);
            println!("centroid:     {:?}", stats.centroid);
            println!("bounds:       {:?} .. {:?}", stats.min, stats.max);
        }
        None => println!("positions:    readback disabled"),
    }
    Ok(())
}

/// Summarises the xyz of every finite texel; `w` is ignored.
fn position_stats(texels: &[f32]) -> PositionStats {
    let mut stats = PositionStats {
        points: texels.len() / 4,
        non_finite: 0,
        centroid: [0.0; 3],
        min: [f32::INFINITY; 3],
        max: [f32::NEG_INFINITY; 3],
    };
    let mut finite = 0usize;
    let mut sum = [0.0f64; 3];
    for texel in texels.chunks_exact(4) {
        if !texel[..3].iter().all(|value| value.is_finite()) {
            stats.non_finite += 1;
            continue;
        }
        finite += 1;
        for axis in 0..3 {
            sum[axis] += f64::from(texel[axis]);
            stats.min[axis] = stats.min[axis].min(texel[axis]);
            stats.max[axis] = stats.max[axis].max(texel[axis]);
        }
    }
    if finite == 0 {
        stats.min = [0.0; 3];
        stats.max = [0.0; 3];
        return stats;
    }
    for axis in 0..3 {
        stats.centroid[axis] = (sum[axis] / finite as f64) as f32;
    }
    stats
}

/// Source of one analyser tick per simulation step.
enum AudioFeed {
    Silent {
        fft_size: usize,
    },
    Wav {
        samples: Vec<f32>,
        cursor: usize,
        hop: usize,
        analyser: AudioAnalyser,
    },
}

impl AudioFeed {
    fn from_wav(path: &Path, fft_size: usize, interval: Duration) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };
        let samples = downmix(&interleaved, usize::from(spec.channels));
        let hop = ((f64::from(spec.sample_rate) * interval.as_secs_f64()).round() as usize).max(1);
        tracing::info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            seconds = samples.len() as f64 / f64::from(spec.sample_rate.max(1)),
            "decoded audio input"
        );
        Ok(Self::Wav {
            samples,
            cursor: 0,
            hop,
            analyser: AudioAnalyser::new(fft_size),
        })
    }

    /// Past the end of the file the feed keeps analysing silence.
    fn next_event(&mut self) -> AudioEvent {
        match self {
            Self::Silent { fft_size } => AudioEvent::silent(*fft_size),
            Self::Wav {
                samples,
                cursor,
                hop,
                analyser,
            } => {
                let start = (*cursor).min(samples.len());
                let end = (*cursor + *hop).min(samples.len());
                let chunk = &samples[start..end];
                if chunk.len() < *hop {
                    let mut padded = chunk.to_vec();
                    padded.resize(*hop, 0.0);
                    analyser.push_samples(&padded);
                } else {
                    analyser.push_samples(chunk);
                }
                *cursor += *hop;
                analyser.analyse()
            }
        }
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

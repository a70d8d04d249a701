use std::sync::Arc;

use anyhow::{anyhow, Result};
use renderer::providers::{
    ControlsProvider, LoudnessProvider, ResolutionProvider, SpectrumProvider, TimeProvider,
};
use renderer::{PropertyProvider, ReactiveShaderPlane, UniformAggregator};
use visconfig::VisConfig;

use crate::cli::ComposeArgs;
use crate::run::{build_loader, control_parameters, resolve_program};

pub fn run(config: &VisConfig, args: ComposeArgs) -> Result<()> {
    let loader = build_loader(config)?;
    let program = resolve_program(&args.program);

    let time = Arc::new(TimeProvider::new());
    time.set_seconds(args.time);
    let controls = Arc::new(ControlsProvider::new(control_parameters(config)));
    let providers: Vec<Arc<dyn PropertyProvider>> = vec![
        Arc::new(ResolutionProvider::new(args.width, args.height)) as Arc<dyn PropertyProvider>,
        time as Arc<dyn PropertyProvider>,
        Arc::new(SpectrumProvider::new(config.audio.fft_size)) as Arc<dyn PropertyProvider>,
        Arc::new(LoudnessProvider::new(Some(Arc::clone(&controls)))) as Arc<dyn PropertyProvider>,
        controls as Arc<dyn PropertyProvider>,
    ];

    let mut plane = ReactiveShaderPlane::new(UniformAggregator::new(providers));
    let meshes = plane.subscribe();
    plane.on_shader_text(loader.load_blocking(&program)?);
    let published = plane.pump()?;
    tracing::debug!(program = %program, published, "composed plane material");

    let mesh = meshes
        .latest()
        .ok_or_else(|| anyhow!("no material was built for {program}"))?;
    print!("{}", mesh.material.fragment_source);
    Ok(())
}

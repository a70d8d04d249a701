use anyhow::{anyhow, Context, Result};
use renderer::providers::ControlParameter;
use shaderload::{Catalog, LoaderConfig, ShaderTextLoader, SourceLocation};
use tracing_subscriber::EnvFilter;
use visconfig::VisConfig;

use crate::cli::{CatalogArgs, GlobalArgs};

/// Logs go to stderr so `compose` output can be piped.
pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_config(global: &GlobalArgs) -> Result<VisConfig> {
    let mut config = match &global.config {
        Some(path) => VisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VisConfig::default(),
    };
    if let Some(base) = &global.shaders {
        config.shaders.base = Some(base.clone());
    }
    config.validate()?;
    tracing::debug!(
        base = ?config.shaders.base,
        initial_methods = config.initial_methods(),
        fft_size = config.audio.fft_size,
        "resolved glvis configuration"
    );
    Ok(config)
}

pub fn build_loader(config: &VisConfig) -> Result<ShaderTextLoader> {
    let base = config
        .shaders
        .base
        .as_deref()
        .ok_or_else(|| anyhow!("no shader base configured; pass --shaders or set shaders.base"))?;
    let location = SourceLocation::parse(base)?;
    let loader_config = LoaderConfig {
        utility: config.shaders.utility.clone(),
        initial_methods: config.initial_methods().to_string(),
        default_vertex: config.shaders.default_vertex.clone(),
    };
    tracing::info!(%location, "loading shaders");
    Ok(ShaderTextLoader::from_location(&location, loader_config)?)
}

pub fn control_parameters(config: &VisConfig) -> Vec<ControlParameter> {
    config
        .effective_controls()
        .into_iter()
        .map(|spec| ControlParameter::new(spec.name, spec.min, spec.max, spec.default))
        .collect()
}

/// Maps a catalog name to its program path; unknown names are used as paths.
pub fn resolve_program(name: &str) -> String {
    Catalog::builtin()
        .find(name)
        .map(|entry| entry.program.clone())
        .unwrap_or_else(|| name.to_string())
}

pub fn list_catalog(args: CatalogArgs) -> Result<()> {
    let catalog = match &args.file {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };
    for entry in &catalog.entries {
        match &entry.description {
            Some(description) => {
                println!("{:<24} {:<24} {description}", entry.name, entry.program)
            }
            None => println!("{:<24} {}", entry.name, entry.program),
        }
    }
    Ok(())
}

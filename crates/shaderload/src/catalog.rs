//! Named visualization catalog.
//!
//! A catalog is a TOML list of `[[visualization]]` tables mapping a display
//! name to the program path the loader fetches. [`Catalog::builtin`] mirrors
//! the programs shipped alongside the shared fragments.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(rename = "visualization", default)]
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

const BUILTIN: &[(&str, &str)] = &[
    ("simple", "Solid colour driven by time"),
    ("fft_matrix_product", "Spectrum texture folded into a matrix product"),
    ("circular_fft", "Spectrum wrapped around a circle"),
    ("vertical_wav", "Waveform drawn as vertical bars"),
    ("threejs_test", "Minimal plane material smoke test"),
    ("video_test", "Camera texture passthrough"),
    ("video_audio_distortion", "Camera texture warped by the spectrum"),
    ("loudness_test", "Loudness and accumulated loudness meters"),
    ("mandelbrot", "Mandelbrot set zoom"),
    ("mandelbrot_mover", "Mandelbrot set steered by loudness"),
    ("flocking", "GPU flocking simulation"),
];

impl Catalog {
    pub fn from_toml_str(input: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = toml::from_str(input)?;
        let issues = catalog.validate();
        if !issues.is_empty() {
            return Err(CatalogError::Validation(issues));
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(name, description)| CatalogEntry {
                name: (*name).to_string(),
                program: if *name == "flocking" {
                    "flocking/texture".to_string()
                } else {
                    (*name).to_string()
                },
                description: Some((*description).to_string()),
            })
            .collect();
        Self { entries }
    }

    /// Lists every problem with the catalog; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                issues.push(format!("visualization #{index} has an empty name"));
            } else if !seen.insert(entry.name.as_str()) {
                issues.push(format!("duplicate visualization name '{}'", entry.name));
            }
            if entry.program.trim().is_empty() {
                issues.push(format!("visualization '{}' has an empty program", entry.name));
            } else if entry.program.ends_with(".frag") || entry.program.ends_with(".vert") {
                issues.push(format!(
                    "visualization '{}' program '{}' must omit the file extension",
                    entry.name, entry.program
                ));
            }
        }
        issues
    }

    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

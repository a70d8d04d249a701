use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisConfig {
    pub version: u32,
    #[serde(default)]
    pub shaders: ShaderSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// `None` selects the flocking defaults; an explicit empty list disables
    /// controls altogether.
    #[serde(default)]
    pub controls: Option<Vec<ControlSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShaderSettings {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default = "default_utility")]
    pub utility: String,
    #[serde(default)]
    pub initial_methods: Option<String>,
    #[serde(default = "default_vertex")]
    pub default_vertex: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(
        default = "default_sample_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub sample_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_texture_width")]
    pub texture_width: u32,
    #[serde(default = "default_cube_size")]
    pub cube_size: f32,
    #[serde(default = "default_freedom_factor")]
    pub freedom_factor: f32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_true")]
    pub readback: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlSpec {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ControlSpec {
    pub fn new(name: &str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
            default,
        }
    }
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            version: 1,
            shaders: ShaderSettings::default(),
            audio: AudioSettings::default(),
            simulation: SimulationSettings::default(),
            controls: None,
        }
    }
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self {
            base: None,
            utility: default_utility(),
            initial_methods: None,
            default_vertex: default_vertex(),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            sample_interval: default_sample_interval(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            texture_width: default_texture_width(),
            cube_size: default_cube_size(),
            freedom_factor: default_freedom_factor(),
            seed: None,
            readback: true,
        }
    }
}

fn default_utility() -> String {
    "util".to_string()
}

fn default_vertex() -> String {
    "plane".to_string()
}

fn default_fft_size() -> usize {
    1024
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(16)
}

fn default_texture_width() -> u32 {
    64
}

fn default_cube_size() -> f32 {
    128.0
}

fn default_freedom_factor() -> f32 {
    5.0
}

fn default_true() -> bool {
    true
}

/// Flocking, loudness and colour controls used when `[[controls]]` is absent.
pub fn default_controls() -> Vec<ControlSpec> {
    vec![
        ControlSpec::new("separationDistance", 0.0, 20.0, 12.0),
        ControlSpec::new("alignmentDistance", 0.0, 20.0, 12.0),
        ControlSpec::new("cohesionDistance", 0.0, 20.0, 12.0),
        ControlSpec::new("roamingDistance", 20.0, 192.0, 96.0),
        ControlSpec::new("speed", 1.0, 10.0, 3.0),
        ControlSpec::new("beatConstant", 1.1, 2.0, 1.4),
        ControlSpec::new("volume", 0.0, 2.0, 1.0),
        ControlSpec::new("hue", -0.5, 0.5, 0.0),
    ]
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map_err(|err| E::custom(format!("duration out of range: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl VisConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: VisConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Controls in effect: the configured list, or the flocking defaults.
    pub fn effective_controls(&self) -> Vec<ControlSpec> {
        self.controls.clone().unwrap_or_else(default_controls)
    }

    /// Name of the shared fragment placed between the utility code and the
    /// program fragment.
    pub fn initial_methods(&self) -> &str {
        if let Some(name) = self.shaders.initial_methods.as_deref() {
            return name;
        }
        match &self.controls {
            Some(controls) if controls.is_empty() => "no_controls",
            _ => "controls_init",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(base) = &self.shaders.base {
            if base.trim().is_empty() {
                return Err(ConfigError::Invalid("shaders.base may not be empty".into()));
            }
        }
        for (field, value) in [
            ("shaders.utility", self.shaders.utility.as_str()),
            ("shaders.default_vertex", self.shaders.default_vertex.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} may not be empty")));
            }
        }

        let fft_size = self.audio.fft_size;
        if fft_size < 32 || !fft_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "audio.fft_size must be a power of two >= 32, got {fft_size}"
            )));
        }
        if self.audio.sample_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "audio.sample_interval must be greater than zero".into(),
            ));
        }

        if self.simulation.texture_width == 0 {
            return Err(ConfigError::Invalid(
                "simulation.texture_width must be greater than zero".into(),
            ));
        }
        if self.simulation.cube_size.is_nan() || self.simulation.cube_size <= 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.cube_size must be greater than zero".into(),
            ));
        }
        if !self.simulation.freedom_factor.is_finite() {
            return Err(ConfigError::Invalid(
                "simulation.freedom_factor must be finite".into(),
            ));
        }

        let mut seen = HashSet::new();
        for control in self.controls.iter().flatten() {
            if control.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "controls contain an entry with an empty name".into(),
                ));
            }
            if !seen.insert(control.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate control '{}'",
                    control.name
                )));
            }
            if control.min > control.max {
                return Err(ConfigError::Invalid(format!(
                    "control '{}' has min {} greater than max {}",
                    control.name, control.min, control.max
                )));
            }
            if control.default < control.min || control.default > control.max {
                return Err(ConfigError::Invalid(format!(
                    "control '{}' default {} lies outside [{}, {}]",
                    control.name, control.default, control.min, control.max
                )));
            }
        }

        Ok(())
    }
}

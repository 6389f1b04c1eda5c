//! Runtime configuration
//!
//! Defaults reproduce the classic demo: grid resolution equal to the surface
//! resolution, one generation per frame, random fill on start. A few
//! environment variables override them:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `TORUS_LIFE_SEED` | seed for every generator (`u64`) |
//! | `TORUS_LIFE_CELL_SIZE` | surface pixels per cell |
//! | `TORUS_LIFE_BACKEND` | `gpu` or `cpu` |
//! | `TORUS_LIFE_SPS` | target generations per second |

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::patterns::GeneratorKind;

pub const ENV_SEED: &str = "TORUS_LIFE_SEED";
pub const ENV_CELL_SIZE: &str = "TORUS_LIFE_CELL_SIZE";
pub const ENV_BACKEND: &str = "TORUS_LIFE_BACKEND";
pub const ENV_STEPS_PER_SECOND: &str = "TORUS_LIFE_SPS";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which transition kernel to build
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Backend {
    #[default]
    Gpu,
    Cpu,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Backend::Gpu),
            "cpu" => Ok(Backend::Cpu),
            other => Err(format!("unknown backend '{other}', expected 'gpu' or 'cpu'")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Gpu => write!(f, "gpu"),
            Backend::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifeConfig {
    pub window_title: String,
    /// Logical window size
    pub initial_size: (u32, u32),
    /// Surface pixels per cell side
    pub cell_size: u32,
    /// Half width of drag strokes, in cells
    pub brush_half_width: u32,
    /// Half width of the dot stamped by a click, in cells
    pub click_half_width: u32,
    /// `None` draws a seed from OS entropy
    pub seed: Option<u64>,
    /// `None` runs one generation per frame
    pub steps_per_second: Option<f32>,
    pub max_steps_per_frame: u32,
    pub backend: Backend,
    pub initial_pattern: GeneratorKind,
    /// Run heavy generators on a worker thread
    pub background_generation: bool,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            window_title: "Torus Life".to_string(),
            initial_size: (1200, 800),
            cell_size: 1,
            brush_half_width: 2,
            click_half_width: 3,
            seed: None,
            steps_per_second: None,
            max_steps_per_frame: 4,
            backend: Backend::Gpu,
            initial_pattern: GeneratorKind::RandomFill,
            background_generation: true,
        }
    }
}

impl LifeConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SEED) {
            self.seed = Some(parse(ENV_SEED, &value)?);
        }
        if let Some(value) = lookup(ENV_CELL_SIZE) {
            self.cell_size = parse(ENV_CELL_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_BACKEND) {
            self.backend = value.parse().map_err(|reason| ConfigError::InvalidEnv {
                var: ENV_BACKEND,
                value: value.clone(),
                reason,
            })?;
        }
        if let Some(value) = lookup(ENV_STEPS_PER_SECOND) {
            self.steps_per_second = Some(parse(ENV_STEPS_PER_SECOND, &value)?);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_size == 0 {
            return Err(ConfigError::Invalid("cell size must be at least 1".into()));
        }
        if self.max_steps_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max steps per frame must be at least 1".into(),
            ));
        }
        if let Some(rate) = self.steps_per_second {
            if !(rate > 0.0 && rate.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "steps per second must be positive, got {rate}"
                )));
            }
        }
        if self.initial_size.0 == 0 || self.initial_size.1 == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".into()));
        }
        Ok(())
    }

    /// Grid resolution for a surface of the given physical size
    pub fn grid_size(&self, surface_width: u32, surface_height: u32) -> (u32, u32) {
        let cell = self.cell_size.max(1);
        (
            (surface_width / cell).max(1),
            (surface_height / cell).max(1),
        )
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.initial_size = (width, height);
        self
    }

    pub fn with_cell_size(mut self, cell_size: u32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_steps_per_second(mut self, rate: Option<f32>) -> Self {
        self.steps_per_second = rate;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_initial_pattern(mut self, kind: GeneratorKind) -> Self {
        self.initial_pattern = kind;
        self
    }

    pub fn with_background_generation(mut self, enabled: bool) -> Self {
        self.background_generation = enabled;
        self
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = LifeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_size(1200, 800), (1200, 800));
        assert_eq!(config.backend, Backend::Gpu);
    }

    #[test]
    fn test_overrides_apply() {
        let config = LifeConfig::default()
            .with_overrides(lookup(&[
                (ENV_SEED, "1234"),
                (ENV_CELL_SIZE, " 4 "),
                (ENV_BACKEND, "CPU"),
                (ENV_STEPS_PER_SECOND, "12.5"),
            ]))
            .unwrap();

        assert_eq!(config.seed, Some(1234));
        assert_eq!(config.cell_size, 4);
        assert_eq!(config.backend, Backend::Cpu);
        assert_eq!(config.steps_per_second, Some(12.5));
        assert_eq!(config.grid_size(1202, 803), (300, 200));
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = LifeConfig::default()
            .with_overrides(lookup(&[(ENV_SEED, "abc")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_SEED, .. }));

        assert!(LifeConfig::default()
            .with_overrides(lookup(&[(ENV_BACKEND, "vulkan")]))
            .is_err());
        assert!(LifeConfig::default()
            .with_overrides(lookup(&[(ENV_CELL_SIZE, "0")]))
            .is_err());
        assert!(LifeConfig::default()
            .with_overrides(lookup(&[(ENV_STEPS_PER_SECOND, "-3")]))
            .is_err());
    }

    #[test]
    fn test_grid_size_never_zero() {
        let config = LifeConfig::default().with_cell_size(8);
        assert_eq!(config.grid_size(3, 0), (1, 1));
    }
}

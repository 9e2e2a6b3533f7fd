//! Render settings.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// How next-event estimation picks a light.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSelection {
    /// Every light equally likely
    #[default]
    Uniform,
    /// Proportional to emitted power (luminance times surface area)
    Power,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of iterations (one sample per pixel each)
    pub iterations: u32,
    /// Maximum path length in bounces
    pub max_depth: u32,
    /// Bounce after which Russian roulette may terminate paths
    pub russian_roulette_depth: u32,
    pub light_selection: LightSelection,
    /// Reorder active paths by material before shading
    pub sort_by_material: bool,
    /// Worker threads; 0 uses the global rayon pool
    pub threads: usize,
    /// Base seed for every per-path random stream
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            iterations: 64,
            max_depth: 8,
            russian_roulette_depth: 3,
            light_selection: LightSelection::Uniform,
            sort_by_material: false,
            threads: 0,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set quality settings.
    pub fn with_quality(mut self, iterations: u32, max_depth: u32) -> Self {
        self.iterations = iterations;
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.iterations == 0 {
            return Err(RenderError::InvalidConfig("iterations must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = RenderConfig::from_json(r#"{ "max_depth": 3, "light_selection": "power", "seed": 9 }"#).unwrap();

        assert_eq!(config.max_depth, 3);
        assert_eq!(config.light_selection, LightSelection::Power);
        assert_eq!(config.seed, 9);
        assert_eq!(config.iterations, RenderConfig::default().iterations);
    }

    #[test]
    fn test_from_json_rejects_zero_depth() {
        let err = RenderConfig::from_json(r#"{ "max_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_json_parse_error() {
        let err = RenderConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RenderError::ConfigParse(_)));
    }
}

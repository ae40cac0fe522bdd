//! Top-level JSON configuration: class definitions, analyzer settings and
//! placement tuning in one document.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::lcc::{AnalyzerConfig, LccAnalyzer, LccType};
use crate::vegetation::{VegetationConfig, VegetationDecorator};

/// Everything needed to analyze and decorate tiles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandCoverConfig {
    /// Classes in declaration order; placement runs in reverse.
    pub types: Vec<LccType>,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub vegetation: VegetationConfig,
}

impl LandCoverConfig {
    /// Reject documents the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(Error::NoLccTypes);
        }
        let mut seen = HashSet::new();
        for lcc in &self.types {
            if !seen.insert(lcc.index) {
                return Err(Error::Config(format!("duplicate class index {}", lcc.index)));
            }
        }
        if !self.vegetation.bucket_resolution.is_power_of_two() {
            return Err(Error::Config(format!(
                "bucket_resolution {} is not a power of two",
                self.vegetation.bucket_resolution
            )));
        }
        let max_texture_size = self.analyzer.max_texture_size;
        if max_texture_size < 2 || !max_texture_size.is_power_of_two() {
            return Err(Error::Config(format!(
                "max_texture_size {} is not a power of two of at least 2",
                self.analyzer.max_texture_size
            )));
        }
        Ok(())
    }

    pub fn save_sync(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load and validate.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn analyzer(&self) -> LccAnalyzer {
        LccAnalyzer::new(self.analyzer.clone(), self.types.clone())
    }

    pub fn decorator(&self) -> VegetationDecorator {
        VegetationDecorator::new(self.vegetation.clone(), self.analyzer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LandCoverConfig {
        LandCoverConfig {
            types: vec![
                LccType::new(5, "shrub", [200, 0, 0]).with_model("bush", 0.5),
                LccType::new(41, "forest", [0, 120, 0]).with_slope(0.0, 30.0).with_model("pine", 1.0),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landcover.json");
        let config = sample();
        config.save_sync(&path).unwrap();
        assert_eq!(LandCoverConfig::load_sync(&path).unwrap(), config);
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let json = r#"{ "types": [ { "index": 41, "name": "forest", "rgb": [0, 120, 0] } ] }"#;
        let config: LandCoverConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.analyzer.image_extension, ".jpg");
        assert_eq!(config.vegetation.seed, 27);
        assert_eq!(config.types[0].slope.max, 90.0);
        assert!(config.types[0].models.is_empty());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(LandCoverConfig::default().validate(), Err(Error::NoLccTypes)));

        let mut dup = sample();
        dup.types[1].index = 5;
        assert!(matches!(dup.validate(), Err(Error::Config(_))));

        let mut buckets = sample();
        buckets.vegetation.bucket_resolution = 100;
        assert!(matches!(buckets.validate(), Err(Error::Config(_))));

        let mut texture = sample();
        texture.analyzer.max_texture_size = 1;
        assert!(matches!(texture.validate(), Err(Error::Config(_))));
        texture.analyzer.max_texture_size = 1000;
        assert!(matches!(texture.validate(), Err(Error::Config(_))));
        texture.analyzer.max_texture_size = 1024;
        texture.validate().unwrap();
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{ "types": [] }"#).unwrap();
        assert!(matches!(LandCoverConfig::load_sync(&path), Err(Error::NoLccTypes)));
    }

    #[test]
    fn test_decorator_keeps_declaration_order() {
        let decorator = sample().decorator();
        let order: Vec<u32> = decorator.placement_order().map(|t| t.index).collect();
        assert_eq!(order, vec![41, 5]);
    }
}

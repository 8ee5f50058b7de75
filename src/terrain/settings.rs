//! Terrain and BVH settings, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::Brush;
use crate::bvh::BvhConfig;
use crate::util::{Error, Result};

/// Terrain settings loaded from a JSON file; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    // Grid
    pub resolution: usize, // vertices per side
    pub size: f32,         // world units per side
    pub height_scale: f32, // world units per heightmap step

    // Editing
    pub brush: Brush,

    // Acceleration structure
    pub bvh: BvhConfig,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            resolution: 128,
            size: 512.0,
            height_scale: 0.25, // 0-255 heightmap -> 0-63.75
            brush: Brush::default(),
            bvh: BvhConfig::default(),
        }
    }
}

impl TerrainSettings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution < 2 {
            return Err(Error::config(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !(self.size > 0.0) {
            return Err(Error::config(format!("size must be positive, got {}", self.size)));
        }
        if !(self.height_scale > 0.0) {
            return Err(Error::config(format!(
                "height_scale must be positive, got {}",
                self.height_scale
            )));
        }
        self.bvh.validate()
    }

    /// Distance between neighbouring grid vertices.
    pub fn step(&self) -> f32 {
        self.size / (self.resolution - 1) as f32
    }

    /// Highest world-space height a heightmap byte can express.
    pub fn max_height(&self) -> f32 {
        255.0 * self.height_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let s = TerrainSettings::default();
        assert_eq!(s.resolution, 128);
        assert_eq!(s.bvh.min_split_primitives, 4);
        assert_eq!(s.bvh.max_depth, 16);
        assert!((s.max_height() - 63.75).abs() < 1e-6);
        s.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: TerrainSettings =
            serde_json::from_str(r#"{ "resolution": 64, "bvh": { "max_depth": 8 } }"#).unwrap();
        assert_eq!(s.resolution, 64);
        assert_eq!(s.size, 512.0);
        assert_eq!(s.bvh.max_depth, 8);
        assert_eq!(s.bvh.min_split_primitives, 4);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp = NamedTempFile::new().expect("Failed to create temp file");
        let mut s = TerrainSettings::default();
        s.resolution = 33;
        s.brush.force = 3.0;
        s.save(temp.path()).unwrap();

        let loaded = TerrainSettings::load(temp.path()).unwrap();
        assert_eq!(loaded, s);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut s = TerrainSettings::default();
        s.resolution = 1;
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));

        let mut s = TerrainSettings::default();
        s.height_scale = 0.0;
        assert!(s.validate().is_err());

        let mut s = TerrainSettings::default();
        s.bvh.min_split_primitives = 1;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_load_garbage_is_json_error() {
        let temp = NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(temp.path(), "not json").unwrap();
        assert!(matches!(TerrainSettings::load(temp.path()), Err(Error::Json(_))));
    }
}

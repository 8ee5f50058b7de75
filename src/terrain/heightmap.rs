//! 8-bit `.raw` heightmap files: one byte per vertex, row-major, no header.

use std::path::Path;

use super::{Terrain, TerrainSettings};
use crate::util::Result;

impl Terrain {
    /// Load terrain from a `.raw` heightmap.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_raw(path: impl AsRef<Path>, settings: &TerrainSettings) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let terrain = Self::from_heightmap(settings, &bytes)?;
        tracing::debug!(
            "loaded {}x{} heightmap, BVH {} nodes",
            settings.resolution,
            settings.resolution,
            terrain.bvh().pool_ptr()
        );
        Ok(terrain)
    }

    /// Current heights quantized back to heightmap bytes.
    pub fn to_heightmap(&self) -> Vec<u8> {
        let scale = self.settings.height_scale;
        self.positions
            .iter()
            .map(|p| (p.y / scale).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Write the current heights as a `.raw` heightmap.
    pub fn save_raw(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_heightmap())?;
        Ok(())
    }
}

//! Editable heightfield terrain that owns the vertex grid and its BVH.
//!
//! - [`Terrain`] - vertex grid, normals and picking BVH
//! - [`TerrainSettings`] - grid dimensions, brush and BVH parameters
//! - [`Brush`] - sculpting brush
//! - [`SharedTerrain`] - concurrent picking with exclusive edits

mod brush;
mod heightmap;
mod settings;
mod shared;

pub use brush::Brush;
pub use settings::TerrainSettings;
pub use shared::SharedTerrain;

use rayon::prelude::*;

use crate::bvh::{Bvh, VertexSource};
use crate::picking::{Ray, RayHit};
use crate::util::{Error, Mat4, Result, Vec2, Vec3};

/// Square heightfield centred on the origin.
///
/// Vertex `(x, z)` (column, row) sits at
/// `(x * step - size/2, height, z * step - size/2)`.
#[derive(Debug, Clone)]
pub struct Terrain {
    settings: TerrainSettings,
    step: f32,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    bvh: Bvh,
}

impl VertexSource for Terrain {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    fn position(&self, index: u32) -> Vec3 {
        self.positions[index as usize]
    }
}

impl Terrain {
    /// Flat terrain at height zero.
    pub fn flat(settings: &TerrainSettings) -> Result<Self> {
        Self::with_heights(settings, |_, _| 0.0)
    }

    /// Terrain from an 8-bit heightmap, one byte per vertex, row-major.
    #[tracing::instrument(skip_all, fields(resolution = settings.resolution, bytes = heightmap.len()))]
    pub fn from_heightmap(settings: &TerrainSettings, heightmap: &[u8]) -> Result<Self> {
        let expected = settings.resolution * settings.resolution;
        if heightmap.len() != expected {
            return Err(Error::HeightmapSize {
                expected,
                actual: heightmap.len(),
            });
        }

        let res = settings.resolution;
        let scale = settings.height_scale;
        Self::with_heights(settings, |x, z| heightmap[z * res + x] as f32 * scale)
    }

    /// Terrain whose world-space height at column `x`, row `z` is `height(x, z)`.
    pub fn with_heights<F>(settings: &TerrainSettings, height: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f32,
    {
        settings.validate()?;

        let res = settings.resolution;
        let step = settings.step();
        let half = 0.5 * settings.size;

        let mut positions = Vec::with_capacity(res * res);
        for z in 0..res {
            for x in 0..res {
                positions.push(Vec3::new(
                    x as f32 * step - half,
                    height(x, z),
                    z as f32 * step - half,
                ));
            }
        }

        let bvh = Bvh::from_grid(&positions, res, res, &settings.bvh)?;
        let mut terrain = Self {
            settings: settings.clone(),
            step,
            normals: vec![Vec3::Y; positions.len()],
            positions,
            bvh,
        };
        terrain.compute_normals();
        Ok(terrain)
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn resolution(&self) -> usize {
        self.settings.resolution
    }

    /// Distance between neighbouring grid vertices.
    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Vertex buffer index of column `x`, row `z`.
    pub fn index(&self, x: usize, z: usize) -> Result<usize> {
        let resolution = self.resolution();
        if x >= resolution || z >= resolution {
            return Err(Error::OutOfBounds { x, z, resolution });
        }
        Ok(z * resolution + x)
    }

    /// World-space height of vertex `(x, z)`.
    pub fn height(&self, x: usize, z: usize) -> Result<f32> {
        Ok(self.positions[self.index(x, z)?].y)
    }

    /// Move vertex `(x, z)` to world-space height `y`.
    ///
    /// Bounds and normals go stale until [`refit`](Self::refit) is called.
    pub fn set_height(&mut self, x: usize, z: usize, y: f32) -> Result<()> {
        let idx = self.index(x, z)?;
        self.positions[idx].y = y;
        Ok(())
    }

    /// Grid coordinates `(x, z)` whose vertex a world position maps to,
    /// clamped to the grid.
    pub fn grid_coords(&self, p: Vec3) -> (usize, usize) {
        let half = 0.5 * self.settings.size;
        let max = (self.resolution() - 1) as f32;
        let x = ((p.x + half) / self.step).floor().clamp(0.0, max);
        let z = ((p.z + half) / self.step).floor().clamp(0.0, max);
        (x as usize, z as usize)
    }

    /// Bring normals and BVH bounds up to date after height edits.
    pub fn refit(&mut self) -> Result<()> {
        self.compute_normals();
        self.bvh.refit(&self.positions)
    }

    /// Nearest terrain hit along `ray`.
    pub fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        self.bvh.intersect(&self.positions, ray)
    }

    /// World-space point where `ray` first meets the terrain.
    pub fn pick(&self, ray: &Ray) -> Option<Vec3> {
        self.intersect(ray).map(|hit| hit.point)
    }

    /// World-space terrain point under the cursor.
    ///
    /// `cursor` and `viewport` are in pixels; `inv_view_proj` is the inverse
    /// of the camera's view-projection matrix.
    pub fn cursor_intersects(&self, cursor: Vec2, viewport: Vec2, inv_view_proj: &Mat4) -> Option<Vec3> {
        let ray = Ray::from_screen(cursor, viewport, inv_view_proj)?;
        self.pick(&ray)
    }

    /// Central-difference normals for interior vertices; border vertices
    /// point straight up.
    fn compute_normals(&mut self) {
        let res = self.resolution();
        let positions = &self.positions;

        self.normals
            .par_chunks_mut(res)
            .enumerate()
            .for_each(|(z, row)| {
                for (x, normal) in row.iter_mut().enumerate() {
                    if x == 0 || z == 0 || x == res - 1 || z == res - 1 {
                        *normal = Vec3::Y;
                        continue;
                    }
                    let at = |x: usize, z: usize| positions[z * res + x];
                    let up_down = at(x, z + 1) - at(x, z - 1);
                    let left_right = at(x - 1, z) - at(x + 1, z);
                    *normal = left_right.cross(up_down).normalize_or(Vec3::Y);
                }
            });
    }
}

//! Brush sculpting.

use serde::{Deserialize, Serialize};

use super::Terrain;
use crate::util::{Result, Vec3};

/// Circular raise/lower brush.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brush {
    /// Diameter in world units.
    pub size: f32,
    /// Maximum height change per stroke.
    pub force: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            size: 10.0,
            force: 1.0,
        }
    }
}

impl Brush {
    pub const MIN_SIZE: f32 = 1.0;
    pub const MAX_SIZE: f32 = 127.0;
    pub const MIN_FORCE: f32 = 1.0;
    pub const MAX_FORCE: f32 = 10.0;

    pub fn new(size: f32, force: f32) -> Self {
        Self { size, force }.clamped()
    }

    /// Copy with size and force clamped to their supported ranges.
    pub fn clamped(&self) -> Self {
        Self {
            size: self.size.clamp(Self::MIN_SIZE, Self::MAX_SIZE),
            force: self.force.clamp(Self::MIN_FORCE, Self::MAX_FORCE),
        }
    }
}

impl Terrain {
    /// Apply one brush stroke centred on `click` and refit.
    ///
    /// Vertices in a square window around the grid vertex the click maps to
    /// move by `min(1, d0 / d) * force`, where `d0` is the squared distance
    /// from the click to that grid vertex and `d` the squared distance to the
    /// vertex being moved. Heights stay within `0..=255 * height_scale`.
    pub fn manipulate(&mut self, click: Vec3, brush: &Brush, elevate: bool) -> Result<()> {
        let brush = brush.clamped();
        let res = self.resolution() as isize;
        let max_height = self.settings.max_height();

        let (cx, cz) = self.grid_coords(click);
        // A window wider than the grid covers it all anyway
        let half = ((brush.size * 0.5) / self.step).min(res as f32) as isize;

        let min_x = (cx as isize - half - 1).max(0);
        let min_z = (cz as isize - half - 1).max(0);
        let max_x = (cx as isize + half + 2).min(res);
        let max_z = (cz as isize + half + 2).min(res);

        let center_dist = self.positions[self.index(cx, cz)?].distance_squared(click);

        for z in min_z..max_z {
            for x in min_x..max_x {
                let idx = self.index(x as usize, z as usize)?;
                let p = self.positions[idx];

                let dist = p.distance_squared(click);
                let weight = if dist > 0.0 {
                    (center_dist / dist).min(1.0)
                } else {
                    1.0
                } * brush.force;

                self.positions[idx].y = if elevate {
                    (p.y + weight).min(max_height)
                } else {
                    (p.y - weight).max(0.0)
                };
            }
        }

        tracing::debug!(
            "brush {} at ({cx}, {cz}): window x {min_x}..{max_x}, z {min_z}..{max_z}",
            if elevate { "raise" } else { "lower" }
        );

        self.refit()
    }
}

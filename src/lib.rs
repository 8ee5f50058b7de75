//! # Terrain BVH
//!
//! Refittable bounding volume hierarchy for ray picking on an editable
//! heightfield terrain.
//!
//! The tree is built once over the terrain's fixed triangle connectivity.
//! Sculpting only moves vertices up and down, so after each edit the node
//! bounds are refit in a single pass instead of rebuilding the hierarchy.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (Aabb, glam re-exports, errors)
//! - [`bvh`] - Node pool, builder, refit and nearest-hit traversal
//! - [`picking`] - Rays, slab and ray/triangle tests
//! - [`terrain`] - Vertex grid, brush sculpting, heightmaps and settings
//!
//! ## Example
//!
//! ```ignore
//! use terrain_bvh::prelude::*;
//!
//! let settings = TerrainSettings::default();
//! let mut terrain = Terrain::load_raw("terrain.raw", &settings)?;
//!
//! let ray = Ray::new(Vec3::new(0.0, 100.0, 0.0), Vec3::NEG_Y);
//! if let Some(point) = terrain.pick(&ray) {
//!     terrain.manipulate(point, &settings.brush, true)?;
//! }
//! ```

pub mod util;
pub mod bvh;
pub mod picking;
pub mod terrain;

// Re-export commonly used types
pub use util::{Aabb, Error, Result};
pub use bvh::{Bvh, BvhConfig, BvhStats};
pub use picking::{Ray, RayHit};
pub use terrain::{SharedTerrain, Terrain, TerrainSettings};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Aabb, Error, Mat4, Result, Vec2, Vec3};
    pub use crate::bvh::{Bvh, BvhConfig, Triangle, VertexSource};
    pub use crate::picking::{Ray, RayHit};
    pub use crate::terrain::{Brush, SharedTerrain, Terrain, TerrainSettings};
}

//! Terrain shared between a picking thread pool and a single editor.

use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

use super::{Brush, Terrain};
use crate::picking::Ray;
use crate::util::{Result, Vec3};

/// Cloneable handle to a terrain behind a read/write lock.
///
/// Any number of picks may run at once; edits and refits take the lock
/// exclusively, so no pick ever walks a pool that is half refit.
#[derive(Debug, Clone)]
pub struct SharedTerrain {
    inner: Arc<RwLock<Terrain>>,
}

impl SharedTerrain {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(terrain)),
        }
    }

    /// Shared read access for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, Terrain> {
        self.inner.read()
    }

    pub fn pick(&self, ray: &Ray) -> Option<Vec3> {
        self.inner.read().pick(ray)
    }

    /// Run `edit` with exclusive access, then refit before releasing the lock.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut Terrain) -> R) -> Result<R> {
        let mut terrain = self.inner.write();
        let out = edit(&mut terrain);
        terrain.refit()?;
        Ok(out)
    }

    /// One brush stroke under the exclusive lock.
    pub fn manipulate(&self, click: Vec3, brush: &Brush, elevate: bool) -> Result<()> {
        self.inner.write().manipulate(click, brush, elevate)
    }

    pub fn refit(&self) -> Result<()> {
        self.inner.write().refit()
    }
}

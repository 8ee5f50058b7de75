//! Error types for terrain BVH operations.

use thiserror::Error;

/// Main error type for BVH and terrain operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Build was called with no triangles
    #[error("Cannot build BVH from empty mesh")]
    EmptyMesh,

    /// A triangle references a vertex the source does not have
    #[error("Vertex index {index} out of range (vertex count: {count})")]
    IndexOutOfRange { index: u32, count: usize },

    /// Vertex buffer changed size since the tree was built
    #[error("Vertex count mismatch: built over {expected}, got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },

    /// Grid too small to hold a single quad
    #[error("Invalid grid dimensions {width}x{depth}: need at least 2x2 vertices")]
    InvalidGrid { width: usize, depth: usize },

    /// Heightmap byte count does not match the terrain resolution
    #[error("Heightmap size mismatch: expected {expected} bytes, got {actual}")]
    HeightmapSize { expected: usize, actual: usize },

    /// Grid coordinate outside the terrain
    #[error("Grid coordinate ({x}, {z}) out of bounds (resolution: {resolution})")]
    OutOfBounds { x: usize, z: usize, resolution: usize },

    /// Structural check failed
    #[error("BVH invariant violated: {0}")]
    Invariant(String),

    /// Settings rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invariant violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type alias for terrain BVH operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::EmptyMesh;
        assert!(e.to_string().contains("empty"));

        let e = Error::IndexOutOfRange { index: 17, count: 16 };
        assert!(e.to_string().contains("17"));
        assert!(e.to_string().contains("16"));

        let e = Error::invariant("leaf 3 not tight");
        assert!(e.to_string().contains("leaf 3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

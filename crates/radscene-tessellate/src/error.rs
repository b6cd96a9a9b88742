//! Error types for surface construction.

use thiserror::Error;

/// Reasons a preview surface could not be built from boundary points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// Not enough points to span a face.
    #[error("too few points for a face: {count}")]
    TooFewPoints {
        /// Number of points supplied.
        count: usize,
    },

    /// A direct face only supports triangles and quads.
    #[error("direct face supports 3 or 4 points, got {count}")]
    FaceTooLarge {
        /// Number of points supplied.
        count: usize,
    },

    /// Boundary extraction left nothing to fill.
    #[error("no boundary curves to fill")]
    EmptyBoundary,

    /// A boundary curve does not close on itself.
    #[error("boundary curve is open")]
    OpenBoundary,

    /// The points do not span a plane (collinear or coincident).
    #[error("degenerate boundary: {0}")]
    Degenerate(String),

    /// Some point lies too far from the boundary plane.
    #[error("boundary is not planar (deviation {deviation:.3e})")]
    NonPlanar {
        /// Largest distance of a point from the fitted plane.
        deviation: f64,
    },

    /// Two boundary edges cross each other.
    #[error("boundary self-intersects between edges {first} and {second}")]
    SelfIntersecting {
        /// Index of the first crossing edge.
        first: usize,
        /// Index of the second crossing edge.
        second: usize,
    },

    /// An inner curve is not contained by the outer curve.
    #[error("inner curve {0} lies outside the outer boundary")]
    HoleOutsideBoundary(usize),

    /// Ear clipping ran out of ears before finishing.
    #[error("triangulation stalled with {remaining} vertices left")]
    TriangulationStalled {
        /// Vertices left unclipped.
        remaining: usize,
    },
}

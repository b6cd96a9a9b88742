#![warn(missing_docs)]

//! Math types for the radscene loader.
//!
//! Thin wrappers around nalgebra providing the point and vector types used
//! by scene primitives, tolerance helpers for comparing parsed coordinates,
//! and the axis-aligned bounding volume used for viewport framing.

use nalgebra::Vector3;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in scene units.
    pub linear: f64,
    /// Relative planarity tolerance (fraction of a boundary's extent).
    pub planarity: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 linear, 1e-4 relative planarity).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        planarity: 1e-4,
    };

    /// Create a tolerance from explicit values.
    pub const fn new(linear: f64, planarity: f64) -> Self {
        Self { linear, planarity }
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Allowed out-of-plane deviation for a boundary of the given extent.
    pub fn plane_deviation(&self, extent: f64) -> f64 {
        (extent * self.planarity).max(self.linear)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Build the AABB of a set of points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// True if nothing has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include a sphere.
    pub fn include_sphere(&mut self, center: &Point3, radius: f64) {
        let r = Vec3::repeat(radius.abs());
        self.include_point(&(center - r));
        self.include_point(&(center + r));
    }

    /// Expand this AABB to include another one.
    pub fn union(&mut self, other: &Aabb3) {
        if other.is_empty() {
            return;
        }
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Center of the box, or `None` if empty.
    pub fn center(&self) -> Option<Point3> {
        if self.is_empty() {
            return None;
        }
        Some(nalgebra::center(&self.min, &self.max))
    }

    /// Length of the box diagonal (0 when empty).
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max - self.min).norm()
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

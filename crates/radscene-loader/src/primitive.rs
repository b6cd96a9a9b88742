//! Typed scene primitives.
//!
//! These are plain values produced by the parser. Modifier references are
//! names only; [`crate::graph`] resolves them into shared material handles.

use std::sync::Arc;

use radscene_math::{Aabb3, Point3};
use radscene_tessellate::FaceMesh;

use crate::boundary::BoundaryCurve;

/// Modifier name meaning "no modifier".
pub const VOID_MODIFIER: &str = "void";

/// The three header tokens plus where the record came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveHeader {
    /// Name of the modifier this primitive references.
    pub modifier: String,
    /// Primitive type (`polygon`, `sphere`, `plastic`, ...).
    pub type_name: String,
    /// Primitive name.
    pub name: String,
    /// Source label.
    pub source: Arc<str>,
    /// 1-based header line.
    pub line: usize,
}

impl PrimitiveHeader {
    /// True if the modifier is the `void` sentinel.
    pub fn is_void(&self) -> bool {
        self.modifier == VOID_MODIFIER
    }

    /// `source:line` location string.
    pub fn location(&self) -> String {
        format!("{}:{}", self.source, self.line)
    }
}

/// A polygon with its preview mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPrimitive {
    /// Header.
    pub header: PrimitiveHeader,
    /// Vertex loop as written.
    pub vertices: Vec<Point3>,
    /// Preview faces.
    pub mesh: FaceMesh,
}

/// A sphere. Parsed for bounds only; it has no preview mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SpherePrimitive {
    /// Header.
    pub header: PrimitiveHeader,
    /// Center.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
}

/// Any other primitive type, kept as normalized definition text.
///
/// Materials are the common case, but geometric types other than polygon
/// and sphere (cones, cylinders, ...) also land here.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    /// Header.
    pub header: PrimitiveHeader,
    /// Header line, then the count fields on their own lines, then the
    /// remaining values on one line.
    pub definition: String,
}

/// A parsed primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Polygon with preview geometry.
    Polygon(PolygonPrimitive),
    /// Sphere.
    Sphere(SpherePrimitive),
    /// Material or other untyped record.
    Material(MaterialDef),
}

impl Primitive {
    /// Header of the primitive.
    pub fn header(&self) -> &PrimitiveHeader {
        match self {
            Primitive::Polygon(p) => &p.header,
            Primitive::Sphere(s) => &s.header,
            Primitive::Material(m) => &m.header,
        }
    }

    /// Primitive name.
    pub fn name(&self) -> &str {
        &self.header().name
    }

    /// Modifier name.
    pub fn modifier(&self) -> &str {
        &self.header().modifier
    }

    /// Type name.
    pub fn type_name(&self) -> &str {
        &self.header().type_name
    }

    /// True for polygons and spheres.
    pub fn is_geometry(&self) -> bool {
        !matches!(self, Primitive::Material(_))
    }

    /// Preview mesh, if the primitive has one.
    pub fn mesh(&self) -> Option<&FaceMesh> {
        match self {
            Primitive::Polygon(p) => Some(&p.mesh),
            _ => None,
        }
    }

    /// Spatial extent. Empty for materials.
    pub fn bounds(&self) -> Aabb3 {
        match self {
            Primitive::Polygon(p) => Aabb3::from_points(&p.vertices),
            Primitive::Sphere(s) => {
                let mut aabb = Aabb3::empty();
                aabb.include_sphere(&s.center, s.radius);
                aabb
            }
            Primitive::Material(_) => Aabb3::empty(),
        }
    }
}

/// Wireframe kept for a polygon whose surface could not be built.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticWire {
    /// Name of the failed polygon.
    pub name: String,
    /// Its modifier.
    pub modifier: String,
    /// Source label.
    pub source: Arc<str>,
    /// 1-based header line.
    pub line: usize,
    /// Boundary curves extracted from the raw point loop.
    pub curves: Vec<BoundaryCurve>,
}

impl DiagnosticWire {
    /// Extent of all curve points.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.curves.iter().flat_map(|c| c.points.iter()))
    }
}

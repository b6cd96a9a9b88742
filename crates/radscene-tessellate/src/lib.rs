#![warn(missing_docs)]

//! Preview meshes for the radscene loader.
//!
//! Scene polygons become preview geometry in one of two ways:
//! 1. Triangles and quads are taken as a single face, in point order
//! 2. Larger boundaries are filled as a planar surface and ear-clipped
//!
//! [`FaceMesh`] keeps the faces as built (so a quad stays a quad);
//! [`TriangleMesh`] is the flat buffer layout used for rendering and export.

mod error;
mod planar;

pub use error::SurfaceError;
pub use planar::{newell_normal, planar_surface};

use radscene_math::{Aabb3, Point3, Vec3};

/// A single preview face, indexing into [`FaceMesh::vertices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    /// Three-sided face.
    Triangle([u32; 3]),
    /// Four-sided face.
    Quad([u32; 4]),
}

impl Face {
    /// Vertex indices of this face in winding order.
    pub fn indices(&self) -> &[u32] {
        match self {
            Face::Triangle(i) => &i[..],
            Face::Quad(i) => &i[..],
        }
    }

    fn offset(&self, by: u32) -> Face {
        match *self {
            Face::Triangle([a, b, c]) => Face::Triangle([a + by, b + by, c + by]),
            Face::Quad([a, b, c, d]) => Face::Quad([a + by, b + by, c + by, d + by]),
        }
    }
}

/// Face-based preview mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Faces indexing into `vertices`.
    pub faces: Vec<Face>,
}

impl FaceMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the mesh has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangular faces.
    pub fn num_triangles(&self) -> usize {
        self.faces
            .iter()
            .filter(|f| matches!(f, Face::Triangle(_)))
            .count()
    }

    /// Number of quad faces.
    pub fn num_quads(&self) -> usize {
        self.faces
            .iter()
            .filter(|f| matches!(f, Face::Quad(_)))
            .count()
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &FaceMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces
            .extend(other.faces.iter().map(|f| f.offset(offset)));
    }

    /// Bounding box of all vertices.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(&self.vertices)
    }

    /// Flatten into render buffers, splitting quads and assigning flat
    /// per-face normals.
    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        for face in &self.faces {
            let corners: Vec<Point3> = face
                .indices()
                .iter()
                .map(|&i| self.vertices[i as usize])
                .collect();
            let normal = newell_normal(&corners)
                .try_normalize(1e-12)
                .unwrap_or_else(Vec3::zeros);

            let base = mesh.num_vertices() as u32;
            for p in &corners {
                mesh.vertices
                    .extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
                mesh.normals
                    .extend_from_slice(&[normal.x as f32, normal.y as f32, normal.z as f32]);
            }
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
            if corners.len() == 4 {
                mesh.indices.extend_from_slice(&[base, base + 2, base + 3]);
            }
        }
        mesh
    }
}

/// Output triangle mesh for rendering and export.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]` (u32).
    pub indices: Vec<u32>,
    /// Flat array of vertex normals: `[nx0, ny0, nz0, ...]` (f32). Same length as vertices.
    pub normals: Vec<f32>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            normals: Vec::new(),
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + offset));
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a single face directly from 3 or 4 points, in order.
///
/// No planarity check is made; quads are kept as quads.
pub fn direct_face(points: &[Point3]) -> Result<FaceMesh, SurfaceError> {
    let face = match points.len() {
        0..=2 => {
            return Err(SurfaceError::TooFewPoints {
                count: points.len(),
            })
        }
        3 => Face::Triangle([0, 1, 2]),
        4 => Face::Quad([0, 1, 2, 3]),
        count => return Err(SurfaceError::FaceTooLarge { count }),
    };
    Ok(FaceMesh {
        vertices: points.to_vec(),
        faces: vec![face],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_direct_triangle() {
        let mesh = direct_face(&unit_square()[..3]).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.faces[0], Face::Triangle([0, 1, 2]));
    }

    #[test]
    fn test_direct_quad() {
        let mesh = direct_face(&unit_square()).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_quads(), 1);
        assert_eq!(mesh.num_vertices(), 4);
    }

    #[test]
    fn test_direct_face_rejects_bad_counts() {
        let pts = unit_square();
        assert_eq!(
            direct_face(&pts[..2]),
            Err(SurfaceError::TooFewPoints { count: 2 })
        );
        let mut five = pts.clone();
        five.push(Point3::new(0.5, 0.0, 1.5));
        assert_eq!(
            direct_face(&five),
            Err(SurfaceError::FaceTooLarge { count: 5 })
        );
    }

    #[test]
    fn test_merge_offsets_faces() {
        let mut a = direct_face(&unit_square()).unwrap();
        let b = direct_face(&unit_square()[..3]).unwrap();
        a.merge(&b);
        assert_eq!(a.num_vertices(), 7);
        assert_eq!(a.num_faces(), 2);
        assert_eq!(a.faces[1], Face::Triangle([4, 5, 6]));
    }

    #[test]
    fn test_to_triangle_mesh_splits_quads() {
        let mesh = direct_face(&unit_square()).unwrap().to_triangle_mesh();
        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.normals.len(), mesh.vertices.len());
        // Square in the XZ plane wound x then z: normal points to -Y.
        assert_relative_eq!(mesh.normals[1], -1.0);
    }

    #[test]
    fn test_triangle_mesh_merge() {
        let mut a = direct_face(&unit_square()).unwrap().to_triangle_mesh();
        let b = direct_face(&unit_square()[..3]).unwrap().to_triangle_mesh();
        a.merge(&b);
        assert_eq!(a.num_triangles(), 3);
        assert_eq!(a.indices[6..], [4, 5, 6]);
    }

    #[test]
    fn test_bounds() {
        let mesh = direct_face(&unit_square()).unwrap();
        let b = mesh.bounds();
        assert_eq!(b.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max, Point3::new(1.0, 0.0, 1.0));
    }
}

//! Planar surface construction from closed boundary curves.
//!
//! The largest curve is the outer boundary, every other curve is a hole.
//! The curves are projected into the plane of the outer boundary, checked
//! for planarity and crossings, bridged into a single polygon and
//! ear-clipped.

use std::cmp::Ordering;
use std::collections::HashSet;

use radscene_math::{Aabb3, Point3, Tolerance, Vec3};

use crate::{Face, FaceMesh, SurfaceError};

/// Newell normal of a closed point loop.
///
/// Its length is twice the enclosed area, its direction follows the
/// right-hand rule over the loop order.
pub fn newell_normal(points: &[Point3]) -> Vec3 {
    let mut n = Vec3::zeros();
    let count = points.len();
    for i in 0..count {
        let a = points[i];
        let b = points[(i + 1) % count];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Fill closed boundary curves with a planar, triangulated surface.
///
/// Curves must not repeat their first point at the end. Fails if the
/// curves are degenerate, non-planar, cross each other, or cannot be
/// ear-clipped.
pub fn planar_surface(curves: &[Vec<Point3>], tol: &Tolerance) -> Result<FaceMesh, SurfaceError> {
    if curves.is_empty() {
        return Err(SurfaceError::EmptyBoundary);
    }
    if let Some(short) = curves.iter().find(|c| c.len() < 3) {
        return Err(SurfaceError::TooFewPoints { count: short.len() });
    }

    let (outer_idx, outer_normal) = curves
        .iter()
        .enumerate()
        .map(|(i, c)| (i, newell_normal(c)))
        .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap_or(Ordering::Equal))
        .ok_or(SurfaceError::EmptyBoundary)?;

    let normal = outer_normal
        .try_normalize(1e-12)
        .ok_or_else(|| SurfaceError::Degenerate("boundary encloses no area".into()))?;

    let extent = Aabb3::from_points(curves.iter().flatten()).diagonal();
    let outer_3d = &curves[outer_idx];
    let origin = centroid(outer_3d);

    // Every point must sit on the plane of the outer boundary
    let limit = tol.plane_deviation(extent);
    let deviation = curves
        .iter()
        .flatten()
        .map(|p| (p - origin).dot(&normal).abs())
        .fold(0.0, f64::max);
    if deviation > limit {
        return Err(SurfaceError::NonPlanar { deviation });
    }

    let u_axis = in_plane_axis(outer_3d, &normal)
        .ok_or_else(|| SurfaceError::Degenerate("no edge spans the plane".into()))?;
    let v_axis = normal.cross(&u_axis);
    let project = |p: &Point3| -> (f64, f64) {
        let d = *p - origin;
        (d.dot(&u_axis), d.dot(&v_axis))
    };

    // Outer ring CCW, holes CW
    let mut outer_3d = outer_3d.clone();
    let mut outer_2d: Vec<(f64, f64)> = outer_3d.iter().map(&project).collect();
    if polygon_area_2d(&outer_2d) < 0.0 {
        outer_3d.reverse();
        outer_2d.reverse();
    }

    let mut inner_3d: Vec<Vec<Point3>> = Vec::new();
    let mut inner_2d: Vec<Vec<(f64, f64)>> = Vec::new();
    for (i, curve) in curves.iter().enumerate() {
        if i == outer_idx {
            continue;
        }
        let mut hole_3d = curve.clone();
        let mut hole_2d: Vec<(f64, f64)> = hole_3d.iter().map(&project).collect();
        if polygon_area_2d(&hole_2d) > 0.0 {
            hole_3d.reverse();
            hole_2d.reverse();
        }
        if !point_in_polygon_2d(centroid_2d(&hole_2d), &outer_2d) {
            return Err(SurfaceError::HoleOutsideBoundary(i));
        }
        inner_3d.push(hole_3d);
        inner_2d.push(hole_2d);
    }

    let eps = (tol.linear * extent).max(1e-12);
    let mut rings: Vec<&[(f64, f64)]> = vec![outer_2d.as_slice()];
    rings.extend(inner_2d.iter().map(|h| h.as_slice()));
    check_crossings(&rings, eps)?;

    let mut verts_3d = outer_3d;
    let mut verts_2d = outer_2d;
    let mut inner_starts = Vec::with_capacity(inner_2d.len());
    for (hole_3d, hole_2d) in inner_3d.iter().zip(inner_2d.iter()) {
        inner_starts.push(verts_2d.len());
        verts_3d.extend_from_slice(hole_3d);
        verts_2d.extend_from_slice(hole_2d);
    }

    let poly = bridge_holes(&verts_2d, outer_len(&verts_2d, &inner_starts), &inner_starts);
    let triangles = ear_clip_triangulate(&verts_2d, &poly, eps)?;

    Ok(FaceMesh {
        vertices: verts_3d,
        faces: triangles.into_iter().map(Face::Triangle).collect(),
    })
}

fn outer_len(verts_2d: &[(f64, f64)], inner_starts: &[usize]) -> usize {
    inner_starts.first().copied().unwrap_or(verts_2d.len())
}

fn centroid(points: &[Point3]) -> Point3 {
    let sum = points
        .iter()
        .fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

fn centroid_2d(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
    (sum.0 / n, sum.1 / n)
}

/// Longest outer edge, projected into the plane, as the 2D `u` axis.
fn in_plane_axis(points: &[Point3], normal: &Vec3) -> Option<Vec3> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let e = points[(i + 1) % n] - points[i];
            e - normal * e.dot(normal)
        })
        .max_by(|a, b| a.norm().partial_cmp(&b.norm()).unwrap_or(Ordering::Equal))
        .and_then(|e| e.try_normalize(1e-12))
}

/// Compute signed area of a 2D polygon.
fn polygon_area_2d(pts: &[(f64, f64)]) -> f64 {
    let mut area = 0.0;
    let n = pts.len();
    for i in 0..n {
        let j = (i + 1) % n;
        area += pts[i].0 * pts[j].1 - pts[j].0 * pts[i].1;
    }
    area / 2.0
}

/// Even-odd point containment test.
fn point_in_polygon_2d(p: (f64, f64), poly: &[(f64, f64)]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        if (yi > p.1) != (yj > p.1) && p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn orient(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// True if segments `ab` and `cd` cross at a point interior to both.
fn segments_cross(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64), eps: f64) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    ((o1 > eps && o2 < -eps) || (o1 < -eps && o2 > eps))
        && ((o3 > eps && o4 < -eps) || (o3 < -eps && o4 > eps))
}

/// Reject rings whose edges cross each other or one another.
fn check_crossings(rings: &[&[(f64, f64)]], eps: f64) -> Result<(), SurfaceError> {
    // (ring, local index, start, end)
    let mut edges: Vec<(usize, usize, (f64, f64), (f64, f64))> = Vec::new();
    for (r, ring) in rings.iter().enumerate() {
        let n = ring.len();
        for i in 0..n {
            edges.push((r, i, ring[i], ring[(i + 1) % n]));
        }
    }

    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            let (ri, li, a, b) = edges[i];
            let (rj, lj, c, d) = edges[j];
            if ri == rj {
                let n = rings[ri].len();
                if (li + 1) % n == lj || (lj + 1) % n == li {
                    continue;
                }
            }
            if segments_cross(a, b, c, d, eps) {
                return Err(SurfaceError::SelfIntersecting {
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}

/// Build a merged polygon by bridging the outer ring to each hole.
///
/// Returns indices into `verts_2d`. Each hole is spliced in at the closest
/// pair of (outer, hole) vertices.
fn bridge_holes(verts_2d: &[(f64, f64)], outer_len: usize, inner_starts: &[usize]) -> Vec<usize> {
    let mut poly_indices: Vec<usize> = (0..outer_len).collect();
    let mut used_bridge_vertices: HashSet<usize> = HashSet::new();

    for (hole_idx, &inner_start) in inner_starts.iter().enumerate() {
        let inner_end = inner_starts
            .get(hole_idx + 1)
            .copied()
            .unwrap_or(verts_2d.len());
        let inner_len = inner_end - inner_start;

        // (dist, inner_idx, outer_poly_idx)
        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for i in 0..inner_len {
            let inner_pt = verts_2d[inner_start + i];
            for (j, &outer_idx) in poly_indices.iter().enumerate() {
                let outer_pt = verts_2d[outer_idx];
                let dist = (outer_pt.0 - inner_pt.0).powi(2) + (outer_pt.1 - inner_pt.1).powi(2);
                candidates.push((dist, i, j));
            }
        }
        if candidates.is_empty() {
            continue;
        }
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        // Prefer outer vertices not already used by an earlier bridge
        let (_, best_inner, best_outer_idx) = candidates
            .iter()
            .copied()
            .find(|&(_, _, j)| !used_bridge_vertices.contains(&poly_indices[j]))
            .unwrap_or(candidates[0]);
        used_bridge_vertices.insert(poly_indices[best_outer_idx]);

        let hole_indices: Vec<usize> = (0..inner_len)
            .map(|i| inner_start + ((best_inner + i) % inner_len))
            .collect();

        // poly[..=outer] + hole + [hole[0], poly[outer]] + poly[outer+1..]
        let bridge_outer = poly_indices[best_outer_idx];
        let bridge_inner = hole_indices[0];

        let mut new_poly = Vec::with_capacity(poly_indices.len() + inner_len + 2);
        new_poly.extend_from_slice(&poly_indices[..=best_outer_idx]);
        new_poly.extend_from_slice(&hole_indices);
        new_poly.push(bridge_inner);
        new_poly.push(bridge_outer);
        new_poly.extend_from_slice(&poly_indices[best_outer_idx + 1..]);

        poly_indices = new_poly;
    }

    poly_indices
}

/// Ear-clipping triangulation of a CCW polygon given as indices into `verts_2d`.
///
/// Collinear vertices are dropped without emitting a triangle.
fn ear_clip_triangulate(
    verts_2d: &[(f64, f64)],
    indices: &[usize],
    eps: f64,
) -> Result<Vec<[u32; 3]>, SurfaceError> {
    let mut out = Vec::new();
    if indices.len() < 3 {
        return Err(SurfaceError::TooFewPoints {
            count: indices.len(),
        });
    }

    let mut remaining: Vec<usize> = indices.to_vec();

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut clipped = false;

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;

            let a = verts_2d[remaining[prev]];
            let b = verts_2d[remaining[i]];
            let c = verts_2d[remaining[next]];

            let cross = orient(a, b, c);
            if cross.abs() <= eps {
                remaining.remove(i);
                clipped = true;
                break;
            }
            if cross < 0.0 {
                continue;
            }

            // Bridged polygons repeat vertex indices; those copies never block
            let corners = [remaining[prev], remaining[i], remaining[next]];
            let is_ear = remaining
                .iter()
                .filter(|&&idx| !corners.contains(&idx))
                .all(|&idx| !point_in_triangle_2d(verts_2d[idx], a, b, c));

            if is_ear {
                out.push([
                    remaining[prev] as u32,
                    remaining[i] as u32,
                    remaining[next] as u32,
                ]);
                remaining.remove(i);
                clipped = true;
                break;
            }
        }

        if !clipped {
            return Err(SurfaceError::TriangulationStalled {
                remaining: remaining.len(),
            });
        }
    }

    if remaining.len() == 3 {
        let (a, b, c) = (
            verts_2d[remaining[0]],
            verts_2d[remaining[1]],
            verts_2d[remaining[2]],
        );
        if orient(a, b, c).abs() > eps {
            out.push([remaining[0] as u32, remaining[1] as u32, remaining[2] as u32]);
        }
    }

    if out.is_empty() {
        return Err(SurfaceError::Degenerate("no triangles produced".into()));
    }
    Ok(out)
}

/// Check if a point is inside a triangle in 2D using barycentric coordinates.
fn point_in_triangle_2d(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let v0 = (c.0 - a.0, c.1 - a.1);
    let v1 = (b.0 - a.0, b.1 - a.1);
    let v2 = (p.0 - a.0, p.1 - a.1);

    let dot00 = v0.0 * v0.0 + v0.1 * v0.1;
    let dot01 = v0.0 * v1.0 + v0.1 * v1.1;
    let dot02 = v0.0 * v2.0 + v0.1 * v2.1;
    let dot11 = v1.0 * v1.0 + v1.1 * v1.1;
    let dot12 = v1.0 * v2.0 + v1.1 * v2.1;

    let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

    // Points on the triangle's edges count as inside
    let eps = 1e-10;
    u >= -eps && v >= -eps && (u + v) <= 1.0 + eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Surface area of a face mesh made of triangles.
    fn mesh_area(mesh: &FaceMesh) -> f64 {
        mesh.faces
            .iter()
            .map(|f| {
                let idx = f.indices();
                let pts: Vec<Point3> = idx.iter().map(|&i| mesh.vertices[i as usize]).collect();
                newell_normal(&pts).norm() / 2.0
            })
            .sum()
    }

    fn regular_polygon(n: usize, radius: f64, z: f64) -> Vec<Point3> {
        (0..n)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                Point3::new(radius * t.cos(), radius * t.sin(), z)
            })
            .collect()
    }

    #[test]
    fn test_newell_normal_area() {
        let square = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let n = newell_normal(&square);
        assert_relative_eq!(n.z, 8.0);
        assert_relative_eq!(n.norm() / 2.0, 4.0);
    }

    #[test]
    fn test_hexagon_fills() {
        let hex = regular_polygon(6, 1.0, 0.0);
        let mesh = planar_surface(&[hex], &Tolerance::DEFAULT).unwrap();
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_quads(), 0);
        let expected = 3.0 * 3.0_f64.sqrt() / 2.0;
        assert_relative_eq!(mesh_area(&mesh), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_concave_l_shape() {
        let l_shape = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 1.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, 2.0, 1.0),
            Point3::new(0.0, 2.0, 1.0),
        ];
        let mesh = planar_surface(&[l_shape], &Tolerance::DEFAULT).unwrap();
        assert_eq!(mesh.num_faces(), 4);
        assert_relative_eq!(mesh_area(&mesh), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_boundary_keeps_winding() {
        let mut hex = regular_polygon(6, 1.0, 0.0);
        hex.reverse();
        let mesh = planar_surface(&[hex], &Tolerance::DEFAULT).unwrap();
        let tri = mesh.to_triangle_mesh();
        // Reversed loop faces -Z
        assert!(tri.normals[2] < 0.0);
    }

    #[test]
    fn test_collinear_points_are_dropped() {
        let square_with_midpoints = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let mesh = planar_surface(&[square_with_midpoints], &Tolerance::DEFAULT).unwrap();
        assert_relative_eq!(mesh_area(&mesh), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_square_with_hole() {
        let outer = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let hole: Vec<Point3> = regular_polygon(8, 2.0, 0.0)
            .into_iter()
            .map(|p| Point3::new(p.x + 5.0, p.y + 5.0, 0.0))
            .collect();
        let hole_area = newell_normal(&hole).norm() / 2.0;

        let mesh = planar_surface(&[hole, outer], &Tolerance::DEFAULT).unwrap();
        assert!(mesh.num_faces() > 0);
        assert_relative_eq!(mesh_area(&mesh), 100.0 - hole_area, epsilon = 1e-6);
    }

    #[test]
    fn test_non_planar_fails() {
        let warped = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.5, 1.5, 0.8),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let err = planar_surface(&[warped], &Tolerance::DEFAULT).unwrap_err();
        assert!(matches!(err, SurfaceError::NonPlanar { .. }));
    }

    #[test]
    fn test_bowtie_fails() {
        let bowtie = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let err = planar_surface(&[bowtie], &Tolerance::DEFAULT).unwrap_err();
        assert!(matches!(err, SurfaceError::SelfIntersecting { .. }));
    }

    #[test]
    fn test_collinear_boundary_is_degenerate() {
        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let err = planar_surface(&[line], &Tolerance::DEFAULT).unwrap_err();
        assert!(matches!(err, SurfaceError::Degenerate(_)));
    }

    #[test]
    fn test_hole_outside_fails() {
        let outer = regular_polygon(6, 1.0, 0.0);
        let far: Vec<Point3> = regular_polygon(4, 0.2, 0.0)
            .into_iter()
            .map(|p| Point3::new(p.x + 5.0, p.y, 0.0))
            .collect();
        let err = planar_surface(&[outer, far], &Tolerance::DEFAULT).unwrap_err();
        assert_eq!(err, SurfaceError::HoleOutsideBoundary(1));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            planar_surface(&[], &Tolerance::DEFAULT),
            Err(SurfaceError::EmptyBoundary)
        );
    }
}

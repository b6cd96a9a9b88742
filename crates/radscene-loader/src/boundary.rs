//! Boundary extraction from redundant point loops.
//!
//! Polygons in scene files are often written as a single point loop that
//! walks out to each hole and back, or fans across internal diagonals. Walked
//! in order, such a loop traces every internal diagonal twice and every true
//! boundary edge once. Dropping segments that occur more than once (in either
//! direction) leaves the boundary, which is then chained into curves.

use std::collections::HashMap;

use radscene_math::{Point3, Tolerance};

/// A chain of boundary points.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCurve {
    /// Points in chain order. A closed curve does not repeat its first point.
    pub points: Vec<Point3>,
    /// True if the last point connects back to the first.
    pub closed: bool,
}

impl BoundaryCurve {
    /// Number of segments making up the curve.
    pub fn segment_count(&self) -> usize {
        match (self.closed, self.points.len()) {
            (_, 0) => 0,
            (true, n) => n,
            (false, n) => n - 1,
        }
    }
}

/// Reduces a point loop to its boundary curves.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryExtractor {
    tolerance: Tolerance,
}

impl BoundaryExtractor {
    /// Create an extractor that welds points closer than `tolerance.linear`.
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Extract boundary curves from an ordered point loop.
    ///
    /// The loop is closed if its last point does not already repeat the
    /// first. Zero-length segments are ignored.
    pub fn extract(&self, points: &[Point3]) -> Vec<BoundaryCurve> {
        let (welded, mut ids) = self.weld(points);
        if ids.len() > 1 && ids.first() == ids.last() {
            ids.pop();
        }
        if ids.len() < 2 {
            return Vec::new();
        }

        let segments: Vec<(usize, usize)> = (0..ids.len())
            .map(|i| (ids[i], ids[(i + 1) % ids.len()]))
            .filter(|(a, b)| a != b)
            .collect();

        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for &(a, b) in &segments {
            *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
        let boundary: Vec<(usize, usize)> = segments
            .into_iter()
            .filter(|&(a, b)| counts[&(a.min(b), a.max(b))] == 1)
            .collect();

        log::trace!(
            "Boundary extraction kept {} of {} segments",
            boundary.len(),
            counts.values().sum::<usize>()
        );

        chain_segments(boundary)
            .into_iter()
            .map(|(chain, closed)| BoundaryCurve {
                points: chain.into_iter().map(|id| welded[id]).collect(),
                closed,
            })
            .collect()
    }

    /// Assign each point the id of the first earlier point it coincides with.
    fn weld(&self, points: &[Point3]) -> (Vec<Point3>, Vec<usize>) {
        let mut welded: Vec<Point3> = Vec::new();
        let mut ids = Vec::with_capacity(points.len());
        for p in points {
            let id = match welded
                .iter()
                .position(|q| self.tolerance.points_equal(p, q))
            {
                Some(id) => id,
                None => {
                    welded.push(*p);
                    welded.len() - 1
                }
            };
            ids.push(id);
        }
        (welded, ids)
    }
}

/// Join segments end to end. Returns each chain and whether it closed.
fn chain_segments(segments: Vec<(usize, usize)>) -> Vec<(Vec<usize>, bool)> {
    let mut remaining = segments;
    let mut chains = Vec::new();

    while !remaining.is_empty() {
        let (start, end) = remaining.remove(0);
        let mut chain = vec![start, end];

        let mut changed = true;
        while changed {
            changed = false;
            let mut i = 0;
            while i < remaining.len() {
                let chain_start = chain[0];
                let chain_end = chain[chain.len() - 1];
                if chain.len() > 2 && chain_start == chain_end {
                    break;
                }
                let (a, b) = remaining[i];
                if a == chain_end {
                    chain.push(b);
                } else if b == chain_end {
                    chain.push(a);
                } else if b == chain_start {
                    chain.insert(0, a);
                } else if a == chain_start {
                    chain.insert(0, b);
                } else {
                    i += 1;
                    continue;
                }
                remaining.remove(i);
                changed = true;
            }
        }

        let closed = chain.len() > 2 && chain[0] == chain[chain.len() - 1];
        if closed {
            chain.pop();
        }
        chains.push((chain, closed));
    }

    chains
}

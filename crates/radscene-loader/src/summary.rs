//! Serializable overview of a load, for printing and JSON output.

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::graph::ObjectCollection;
use crate::pipeline::{LoadOutcome, LoadStats};
use crate::primitive::DiagnosticWire;

/// Per-collection overview.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    /// Modifier name.
    pub modifier: String,
    /// Number of member primitives.
    pub members: usize,
    /// Preview faces.
    pub faces: usize,
    /// Preview vertices.
    pub vertices: usize,
    /// Display color as `#rrggbb`.
    pub color: String,
    /// Name of the resolved modifier.
    pub material: Option<String>,
    /// Definition text of the resolved modifier.
    pub material_text: Option<String>,
}

impl From<&ObjectCollection> for CollectionSummary {
    fn from(collection: &ObjectCollection) -> Self {
        let mesh = collection.preview_mesh();
        Self {
            modifier: collection.modifier().to_string(),
            members: collection.members().len(),
            faces: mesh.num_faces(),
            vertices: mesh.num_vertices(),
            color: collection.color().to_hex(),
            material: collection.material().map(|m| m.header.name.clone()),
            material_text: collection.material_text().map(str::to_string),
        }
    }
}

/// Material overview.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialSummary {
    /// Material name.
    pub name: String,
    /// Type name.
    pub type_name: String,
    /// Normalized definition text.
    pub definition: String,
}

/// Wireframe overview.
#[derive(Debug, Clone, Serialize)]
pub struct WireSummary {
    /// Failed polygon name.
    pub name: String,
    /// Its modifier.
    pub modifier: String,
    /// `source:line` of the header.
    pub location: String,
    /// Number of curves.
    pub curves: usize,
    /// Total segments across curves.
    pub segments: usize,
}

impl From<&DiagnosticWire> for WireSummary {
    fn from(wire: &DiagnosticWire) -> Self {
        Self {
            name: wire.name.clone(),
            modifier: wire.modifier.clone(),
            location: format!("{}:{}", wire.source, wire.line),
            curves: wire.curves.len(),
            segments: wire.curves.iter().map(|c| c.segment_count()).sum(),
        }
    }
}

/// Scene extent.
#[derive(Debug, Clone, Serialize)]
pub struct BoundsSummary {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
    /// Center.
    pub center: [f64; 3],
    /// Diagonal length.
    pub diagonal: f64,
}

/// Overview of a whole load.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSummary {
    /// Collections by modifier name.
    pub collections: Vec<CollectionSummary>,
    /// Materials by name.
    pub materials: Vec<MaterialSummary>,
    /// Wireframes of failed polygons.
    pub wireframes: Vec<WireSummary>,
    /// Scene extent, absent for an empty scene.
    pub bounds: Option<BoundsSummary>,
    /// Unique diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Counters.
    pub stats: LoadStats,
    /// True if the load was cancelled.
    pub cancelled: bool,
}

impl SceneSummary {
    /// Summarize a load outcome.
    pub fn new(outcome: &LoadOutcome) -> Self {
        let graph = &outcome.graph;
        let aabb = graph.bounds();
        let bounds = aabb.center().map(|center| BoundsSummary {
            min: [aabb.min.x, aabb.min.y, aabb.min.z],
            max: [aabb.max.x, aabb.max.y, aabb.max.z],
            center: [center.x, center.y, center.z],
            diagonal: aabb.diagonal(),
        });

        Self {
            collections: graph.collections().map(CollectionSummary::from).collect(),
            materials: graph
                .materials()
                .values()
                .map(|m| MaterialSummary {
                    name: m.header.name.clone(),
                    type_name: m.header.type_name.clone(),
                    definition: m.definition.clone(),
                })
                .collect(),
            wireframes: graph.wireframes().iter().map(WireSummary::from).collect(),
            bounds,
            diagnostics: graph.diagnostics().to_vec(),
            stats: outcome.stats,
            cancelled: outcome.cancelled,
        }
    }
}

//! Aggregation of parsed primitives into a linked scene graph.
//!
//! Runs after both pipeline workers have finished. Materials are indexed by
//! name, geometry is linked to its modifier in a separate pure pass, and the
//! linked primitives are grouped into per-modifier collections.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use radscene_math::Aabb3;
use radscene_tessellate::{FaceMesh, TriangleMesh};

use crate::color::{Rgb, SessionContext};
use crate::config::LoaderConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::LoadError;
use crate::primitive::{DiagnosticWire, MaterialDef, Primitive, VOID_MODIFIER};

/// A geometry primitive with its modifier resolved.
#[derive(Debug, Clone)]
pub struct LinkedPrimitive {
    /// The primitive.
    pub primitive: Primitive,
    /// Resolved modifier, if found.
    pub modifier: Option<Arc<MaterialDef>>,
}

/// All geometry sharing one modifier name.
#[derive(Debug, Clone)]
pub struct ObjectCollection {
    modifier: String,
    color: Rgb,
    material: Option<Arc<MaterialDef>>,
    members: Vec<LinkedPrimitive>,
    preview: FaceMesh,
    stale: bool,
}

impl ObjectCollection {
    /// Create an empty collection.
    pub fn new(
        modifier: impl Into<String>,
        color: Rgb,
        material: Option<Arc<MaterialDef>>,
    ) -> Self {
        Self {
            modifier: modifier.into(),
            color,
            material,
            members: Vec::new(),
            preview: FaceMesh::new(),
            stale: false,
        }
    }

    /// Append a member. The preview mesh is rebuilt on the next [`update`](Self::update).
    pub fn push(&mut self, member: LinkedPrimitive) {
        self.members.push(member);
        self.stale = true;
    }

    /// Rebuild the merged preview mesh if members changed.
    pub fn update(&mut self) {
        if !self.stale {
            return;
        }
        let mut merged = FaceMesh::new();
        for mesh in self.members.iter().filter_map(|m| m.primitive.mesh()) {
            merged.merge(mesh);
        }
        self.preview = merged;
        self.stale = false;
    }

    /// True if members were added since the last update.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Merged preview mesh as of the last update.
    pub fn preview_mesh(&self) -> &FaceMesh {
        &self.preview
    }

    /// Modifier name.
    pub fn modifier(&self) -> &str {
        &self.modifier
    }

    /// Display color.
    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Resolved modifier.
    pub fn material(&self) -> Option<&Arc<MaterialDef>> {
        self.material.as_ref()
    }

    /// Definition text of the resolved modifier.
    pub fn material_text(&self) -> Option<&str> {
        self.material.as_deref().map(|m| m.definition.as_str())
    }

    /// Members in parse order.
    pub fn members(&self) -> &[LinkedPrimitive] {
        &self.members
    }

    /// Number of member vertices that will be merged.
    fn pending_vertices(&self) -> usize {
        self.members
            .iter()
            .filter_map(|m| m.primitive.mesh())
            .map(FaceMesh::num_vertices)
            .sum()
    }

    /// Extent of all members.
    pub fn bounds(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for member in &self.members {
            aabb.union(&member.primitive.bounds());
        }
        aabb
    }
}

/// Materials by name, with a fallback by type name.
#[derive(Debug, Default)]
pub struct MaterialIndex {
    by_name: BTreeMap<String, Arc<MaterialDef>>,
    by_type: HashMap<String, Arc<MaterialDef>>,
}

impl MaterialIndex {
    /// Index material definitions in order.
    ///
    /// A later definition of the same name replaces the earlier one; the
    /// type-name fallback keeps the first definition of each type.
    pub fn build(materials: impl IntoIterator<Item = MaterialDef>) -> Self {
        let mut index = Self::default();
        for material in materials {
            let material = Arc::new(material);
            index
                .by_type
                .entry(material.header.type_name.clone())
                .or_insert_with(|| Arc::clone(&material));
            if let Some(previous) = index
                .by_name
                .insert(material.header.name.clone(), Arc::clone(&material))
            {
                log::debug!(
                    "{}: material {} redefined (was {})",
                    material.header.location(),
                    material.header.name,
                    previous.header.location()
                );
            }
        }
        index
    }

    /// Resolve a modifier name.
    pub fn resolve(&self, modifier: &str, by_type_alias: bool) -> Option<Arc<MaterialDef>> {
        self.by_name
            .get(modifier)
            .or_else(|| by_type_alias.then(|| self.by_type.get(modifier)).flatten())
            .cloned()
    }

    /// Number of distinct material names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if there are no materials.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn into_map(self) -> BTreeMap<String, Arc<MaterialDef>> {
        self.by_name
    }
}

/// Link geometry to its modifiers.
///
/// Returns the linked primitives in order, plus the unresolved modifier
/// names in first-seen order. `void` is never unresolved.
pub fn link_primitives(
    geometry: Vec<Primitive>,
    index: &MaterialIndex,
    by_type_alias: bool,
) -> (Vec<LinkedPrimitive>, Vec<(String, String)>) {
    let mut resolved: HashMap<String, Option<Arc<MaterialDef>>> = HashMap::new();
    let mut missing = Vec::new();
    let mut reported = HashSet::new();

    let linked = geometry
        .into_iter()
        .map(|primitive| {
            let name = primitive.modifier().to_string();
            let modifier = resolved
                .entry(name.clone())
                .or_insert_with(|| index.resolve(&name, by_type_alias))
                .clone();
            if modifier.is_none() && name != VOID_MODIFIER && reported.insert(name.clone()) {
                let first_use = format!(
                    "{} at {}",
                    primitive.name(),
                    primitive.header().location()
                );
                missing.push((name, first_use));
            }
            LinkedPrimitive {
                primitive,
                modifier,
            }
        })
        .collect();

    (linked, missing)
}

/// The result of a load.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    collections: BTreeMap<String, ObjectCollection>,
    materials: BTreeMap<String, Arc<MaterialDef>>,
    bounds: Aabb3,
    wireframes: Vec<DiagnosticWire>,
    diagnostics: Vec<Diagnostic>,
}

impl SceneGraph {
    /// Collections by modifier name.
    pub fn collections(&self) -> impl Iterator<Item = &ObjectCollection> {
        self.collections.values()
    }

    /// Collection for a modifier name.
    pub fn collection(&self, modifier: &str) -> Option<&ObjectCollection> {
        self.collections.get(modifier)
    }

    /// Number of collections.
    pub fn num_collections(&self) -> usize {
        self.collections.len()
    }

    /// Materials by name.
    pub fn materials(&self) -> &BTreeMap<String, Arc<MaterialDef>> {
        &self.materials
    }

    /// Material by name.
    pub fn material(&self, name: &str) -> Option<&Arc<MaterialDef>> {
        self.materials.get(name)
    }

    /// Extent of all geometry and wireframes.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Wireframes for polygons whose surface failed.
    pub fn wireframes(&self) -> &[DiagnosticWire] {
        &self.wireframes
    }

    /// Unique diagnostics in first-seen order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of geometry primitives across all collections.
    pub fn num_primitives(&self) -> usize {
        self.collections.values().map(|c| c.members.len()).sum()
    }

    /// True if nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.materials.is_empty() && self.wireframes.is_empty()
    }

    /// All collection previews merged into one render mesh.
    pub fn preview_mesh(&self) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        for collection in self.collections.values() {
            mesh.merge(&collection.preview_mesh().to_triangle_mesh());
        }
        mesh
    }
}

/// Builds a [`SceneGraph`] from parser output.
pub struct ObjectGraphBuilder<'a> {
    config: &'a LoaderConfig,
    session: &'a mut SessionContext,
}

impl<'a> ObjectGraphBuilder<'a> {
    /// Create a builder drawing colors from `session`.
    pub fn new(config: &'a LoaderConfig, session: &'a mut SessionContext) -> Self {
        Self { config, session }
    }

    /// Aggregate primitives and wireframes.
    ///
    /// `upstream` diagnostics (from ingestion and parsing) come first in the
    /// graph's diagnostic list.
    pub fn build(
        self,
        primitives: Vec<Primitive>,
        wireframes: Vec<DiagnosticWire>,
        upstream: Vec<Diagnostic>,
    ) -> Result<SceneGraph, LoadError> {
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(upstream);

        let (geometry, materials): (Vec<Primitive>, Vec<Primitive>) =
            primitives.into_iter().partition(Primitive::is_geometry);
        let index = MaterialIndex::build(materials.into_iter().filter_map(|p| match p {
            Primitive::Material(m) => Some(m),
            _ => None,
        }));

        let (linked, missing) =
            link_primitives(geometry, &index, self.config.resolve_by_type_alias);
        for (name, first_use) in missing {
            let message = format!("modifier '{}' not found (first used by {})", name, first_use);
            log::debug!("{}", message);
            diagnostics.push(Diagnostic::warning(DiagnosticKind::MissingModifier, message));
        }

        let mut bounds = Aabb3::empty();
        let mut collections: BTreeMap<String, ObjectCollection> = BTreeMap::new();
        for member in linked {
            bounds.union(&member.primitive.bounds());
            let modifier = member.primitive.modifier();
            if !collections.contains_key(modifier) {
                let color = self.session.colors_mut().color_for(modifier);
                let collection =
                    ObjectCollection::new(modifier, color, member.modifier.clone());
                collections.insert(modifier.to_string(), collection);
            }
            if let Some(collection) = collections.get_mut(member.primitive.modifier()) {
                collection.push(member);
            }
        }

        let total_vertices: usize = collections.values().map(|c| c.pending_vertices()).sum();
        if total_vertices > u32::MAX as usize {
            return Err(LoadError::aggregation(format!(
                "{} preview vertices exceed the index range",
                total_vertices
            )));
        }
        for collection in collections.values_mut() {
            collection.update();
        }

        for wire in &wireframes {
            bounds.union(&wire.bounds());
        }

        log::info!(
            "Built scene graph: {} collections, {} materials, {} wireframes, {} diagnostics",
            collections.len(),
            index.len(),
            wireframes.len(),
            diagnostics.len()
        );

        Ok(SceneGraph {
            collections,
            materials: index.into_map(),
            bounds,
            wireframes,
            diagnostics: diagnostics.into_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::FixedColors;
    use crate::diagnostics::Severity;
    use crate::primitive::{PolygonPrimitive, PrimitiveHeader, SpherePrimitive};
    use radscene_math::Point3;
    use radscene_tessellate::direct_face;

    fn header(modifier: &str, type_name: &str, name: &str) -> PrimitiveHeader {
        PrimitiveHeader {
            modifier: modifier.to_string(),
            type_name: type_name.to_string(),
            name: name.to_string(),
            source: Arc::from("t.rad"),
            line: 1,
        }
    }

    fn triangle(modifier: &str, name: &str, z: f64) -> Primitive {
        let vertices = vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(0.0, 1.0, z),
        ];
        Primitive::Polygon(PolygonPrimitive {
            header: header(modifier, "polygon", name),
            mesh: direct_face(&vertices).unwrap(),
            vertices,
        })
    }

    fn material(type_name: &str, name: &str, values: &str) -> Primitive {
        Primitive::Material(MaterialDef {
            header: header("void", type_name, name),
            definition: format!("void {} {}\n0\n0\n{}", type_name, name, values),
        })
    }

    fn build(primitives: Vec<Primitive>) -> SceneGraph {
        let config = LoaderConfig::default();
        let mut session = SessionContext::with_seed(1);
        ObjectGraphBuilder::new(&config, &mut session)
            .build(primitives, Vec::new(), Vec::new())
            .unwrap()
    }

    #[test]
    fn test_shared_modifier_merges() {
        let graph = build(vec![
            triangle("glass.1", "a", 0.0),
            triangle("glass.1", "b", 1.0),
            material("glass", "glass.1", "3 1 1 1"),
        ]);
        assert_eq!(graph.num_collections(), 1);
        let collection = graph.collection("glass.1").unwrap();
        assert_eq!(collection.members().len(), 2);
        assert!(!collection.is_stale());
        assert_eq!(collection.preview_mesh().num_faces(), 2);
        assert_eq!(collection.preview_mesh().num_vertices(), 6);
        assert_eq!(collection.material_text(), Some("void glass glass.1\n0\n0\n3 1 1 1"));
        assert!(collection
            .members()
            .iter()
            .all(|m| m.modifier.as_ref().map(|d| d.header.name.as_str()) == Some("glass.1")));
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_missing_modifier_reported_once() {
        let graph = build(vec![
            triangle("missingMat", "a", 0.0),
            triangle("missingMat", "b", 0.0),
        ]);
        assert_eq!(graph.diagnostics().len(), 1);
        let d = &graph.diagnostics()[0];
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.kind, DiagnosticKind::MissingModifier);
        assert!(d.message.contains("missingMat"));
        assert!(graph.collection("missingMat").unwrap().material().is_none());
    }

    #[test]
    fn test_void_never_reported() {
        let graph = build(vec![triangle("void", "a", 0.0)]);
        assert!(graph.diagnostics().is_empty());
        assert!(graph.collection("void").unwrap().material().is_none());
    }

    #[test]
    fn test_type_alias_resolution() {
        let graph = build(vec![
            triangle("glass", "w", 0.0),
            material("glass", "GlassMat", "3 0.96 0.96 0.96"),
            material("glass", "Other", "3 0.5 0.5 0.5"),
        ]);
        let collection = graph.collection("glass").unwrap();
        assert_eq!(collection.material().unwrap().header.name, "GlassMat");
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_alias_disabled() {
        let config = LoaderConfig {
            resolve_by_type_alias: false,
            ..LoaderConfig::default()
        };
        let mut session = SessionContext::new();
        let graph = ObjectGraphBuilder::new(&config, &mut session)
            .build(
                vec![triangle("glass", "w", 0.0), material("glass", "GlassMat", "3 1 1 1")],
                Vec::new(),
                Vec::new(),
            )
            .unwrap();
        assert!(graph.collection("glass").unwrap().material().is_none());
        assert_eq!(graph.diagnostics().len(), 1);
    }

    #[test]
    fn test_name_match_beats_alias_and_later_wins() {
        let index = MaterialIndex::build(
            [
                material("plastic", "red", "5 1 0 0 0 0"),
                material("metal", "plastic", "5 1 1 1 0 0"),
                material("plastic", "red", "5 0.9 0 0 0 0"),
            ]
            .into_iter()
            .filter_map(|p| match p {
                Primitive::Material(m) => Some(m),
                _ => None,
            }),
        );
        assert_eq!(index.len(), 2);
        assert!(index.resolve("red", false).unwrap().definition.contains("0.9"));
        assert_eq!(index.resolve("plastic", true).unwrap().header.type_name, "metal");
        assert_eq!(index.resolve("metal", true).unwrap().header.name, "plastic");
        assert!(index.resolve("metal", false).is_none());
    }

    #[test]
    fn test_link_is_pure() {
        let index = MaterialIndex::default();
        let (linked, missing) = link_primitives(
            vec![triangle("a", "x", 0.0), triangle("void", "y", 0.0), triangle("a", "z", 0.0)],
            &index,
            true,
        );
        assert_eq!(linked.len(), 3);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, "a");
        assert!(missing[0].1.starts_with("x at"));
    }

    #[test]
    fn test_colors_from_session() {
        let red = Rgb::new(1.0, 0.0, 0.0);
        let green = Rgb::new(0.0, 1.0, 0.0);
        let config = LoaderConfig::default();
        let mut session = SessionContext::with_source(FixedColors::new(vec![red, green]));
        let graph = ObjectGraphBuilder::new(&config, &mut session)
            .build(
                vec![triangle("b", "1", 0.0), triangle("a", "2", 0.0), triangle("b", "3", 0.0)],
                Vec::new(),
                Vec::new(),
            )
            .unwrap();
        assert_eq!(graph.collection("b").unwrap().color(), red);
        assert_eq!(graph.collection("a").unwrap().color(), green);

        // Rebuilding with the same session keeps colors.
        let graph = ObjectGraphBuilder::new(&config, &mut session)
            .build(vec![triangle("a", "2", 0.0)], Vec::new(), Vec::new())
            .unwrap();
        assert_eq!(graph.collection("a").unwrap().color(), green);
    }

    #[test]
    fn test_bounds_include_spheres_and_wires() {
        let sphere = Primitive::Sphere(SpherePrimitive {
            header: header("void", "sphere", "s"),
            center: Point3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        });
        let wire = DiagnosticWire {
            name: "w".into(),
            modifier: "m".into(),
            source: Arc::from("t.rad"),
            line: 2,
            curves: vec![crate::boundary::BoundaryCurve {
                points: vec![Point3::new(0.0, -3.0, 0.0)],
                closed: false,
            }],
        };
        let config = LoaderConfig::default();
        let mut session = SessionContext::new();
        let graph = ObjectGraphBuilder::new(&config, &mut session)
            .build(vec![triangle("void", "t", 0.0), sphere], vec![wire], Vec::new())
            .unwrap();
        let b = graph.bounds();
        assert_eq!(b.min, Point3::new(0.0, -3.0, -1.0));
        assert_eq!(b.max, Point3::new(6.0, 1.0, 1.0));
        assert_eq!(graph.wireframes().len(), 1);
        // Sphere is a member but adds no preview faces.
        let void = graph.collection("void").unwrap();
        assert_eq!(void.members().len(), 2);
        assert_eq!(void.preview_mesh().num_faces(), 1);
    }

    #[test]
    fn test_upstream_diagnostics_deduplicated() {
        let config = LoaderConfig::default();
        let mut session = SessionContext::new();
        let d = Diagnostic::warning(DiagnosticKind::UnsupportedReference, "ref");
        let graph = ObjectGraphBuilder::new(&config, &mut session)
            .build(Vec::new(), Vec::new(), vec![d.clone(), d])
            .unwrap();
        assert_eq!(graph.diagnostics().len(), 1);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_update_is_explicit() {
        let mut collection = ObjectCollection::new("m", Rgb::new(0.0, 0.0, 0.0), None);
        collection.push(LinkedPrimitive {
            primitive: triangle("m", "a", 0.0),
            modifier: None,
        });
        assert!(collection.is_stale());
        assert!(collection.preview_mesh().is_empty());
        collection.update();
        assert_eq!(collection.preview_mesh().num_faces(), 1);
    }

    #[test]
    fn test_preview_mesh() {
        let graph = build(vec![triangle("a", "1", 0.0), triangle("b", "2", 0.0)]);
        let mesh = graph.preview_mesh();
        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.indices[3..], [3, 4, 5]);
    }
}

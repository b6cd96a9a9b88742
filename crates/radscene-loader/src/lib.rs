#![warn(missing_docs)]

//! Loader for lighting-simulation scene description text.
//!
//! Turns loosely structured scene files into a cross-referenced object graph
//! for preview. Loading runs as two workers joined by a bounded queue:
//! - an ingestor that segments lines into raw primitive records
//! - a parser that types each record and builds its preview geometry
//!
//! Once both finish, geometry is grouped by modifier into collections and
//! each collection's modifier is resolved against the scene's materials.
//! Per-primitive problems never abort a load; they are reported as
//! severity-tagged diagnostics.
//!
//! # Example
//!
//! ```no_run
//! use radscene_loader::{NoopHost, SceneLoader, SessionContext};
//!
//! let loader = SceneLoader::default();
//! let mut session = SessionContext::new();
//! let outcome = loader
//!     .load_files(&["scene.rad", "materials.rad"], &NoopHost, &mut session)
//!     .unwrap();
//!
//! for collection in outcome.graph.collections() {
//!     println!("{}: {} members", collection.modifier(), collection.members().len());
//! }
//! ```

mod boundary;
mod color;
mod config;
mod diagnostics;
mod error;
mod graph;
mod host;
mod ingest;
mod lexer;
mod parser;
mod pipeline;
mod primitive;
mod summary;

pub use boundary::{BoundaryCurve, BoundaryExtractor};
pub use color::{ColorCache, ColorSource, FixedColors, Rgb, SessionContext, SplitMixColors};
pub use config::LoaderConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{GeometryConstructionFailure, LoadError, RecordError};
pub use graph::{
    link_primitives, LinkedPrimitive, MaterialIndex, ObjectCollection, ObjectGraphBuilder,
    SceneGraph,
};
pub use host::{CancellationToken, LoadHost, NoopHost};
pub use ingest::{FileIngestor, IngestReport, SceneSource};
pub use lexer::{
    classify_line, is_header_line, is_reference_line, is_skipped_line, ExternalReference,
    LineClass, PrimitiveRecord, SegmentStep, Segmenter, SegmenterState,
};
pub use parser::{
    build_polygon_mesh, definition_text, tokenize, ParseOutcome, ParseReport, PrimitiveParser,
};
pub use pipeline::{LoadOutcome, LoadStats, SceneLoader};
pub use primitive::{
    DiagnosticWire, MaterialDef, PolygonPrimitive, Primitive, PrimitiveHeader, SpherePrimitive,
    VOID_MODIFIER,
};
pub use summary::{BoundsSummary, CollectionSummary, MaterialSummary, SceneSummary, WireSummary};

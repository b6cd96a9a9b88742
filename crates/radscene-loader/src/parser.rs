//! Record parsing: the consumer half of the pipeline.
//!
//! A record is `modifier type name` followed by three argument counts and
//! the real arguments. Only records without string or integer arguments are
//! understood; everything after the third count is read as reals.

use std::sync::Arc;

use radscene_math::{Point3, Tolerance};
use radscene_tessellate::{direct_face, planar_surface, FaceMesh, SurfaceError};

use crate::boundary::BoundaryExtractor;
use crate::config::LoaderConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{GeometryConstructionFailure, RecordError};
use crate::host::LoadHost;
use crate::lexer::PrimitiveRecord;
use crate::primitive::{
    DiagnosticWire, MaterialDef, PolygonPrimitive, Primitive, PrimitiveHeader, SpherePrimitive,
};

/// Index of the first real argument.
const FIRST_REAL: usize = 6;

/// Split a record into non-empty whitespace-separated tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Rebuild a normalized definition: header, each count on its own line,
/// then the remaining values on one line.
pub fn definition_text(tokens: &[&str]) -> String {
    let mut lines = vec![tokens[..tokens.len().min(3)].join(" ")];
    lines.extend(tokens.iter().skip(3).take(2).map(|t| t.to_string()));
    if tokens.len() > 5 {
        lines.push(tokens[5..].join(" "));
    }
    lines.join("\n")
}

/// Build the preview mesh for a polygon's point loop.
///
/// Three or four points become a single face. Larger loops are reduced to
/// their boundary curves and filled as a planar surface.
pub fn build_polygon_mesh(
    points: &[Point3],
    extractor: &BoundaryExtractor,
    tolerance: &Tolerance,
) -> Result<FaceMesh, SurfaceError> {
    if points.len() <= 4 {
        return direct_face(points);
    }
    let curves = extractor.extract(points);
    if curves.is_empty() {
        return Err(SurfaceError::EmptyBoundary);
    }
    if curves.iter().any(|c| !c.closed) {
        return Err(SurfaceError::OpenBoundary);
    }
    let loops: Vec<Vec<Point3>> = curves.into_iter().map(|c| c.points).collect();
    planar_surface(&loops, tolerance)
}

/// Result of parsing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A typed primitive.
    Primitive(Primitive),
    /// A polygon whose surface failed; only its wireframe survives.
    Failed {
        /// Wireframe of the raw point loop.
        wire: DiagnosticWire,
        /// Why the surface failed.
        failure: GeometryConstructionFailure,
    },
}

/// Everything the parser produced.
#[derive(Debug, Default)]
pub struct ParseReport {
    /// Parsed primitives in record order.
    pub primitives: Vec<Primitive>,
    /// Wireframes of failed polygons in record order.
    pub wireframes: Vec<DiagnosticWire>,
    /// Diagnostics raised while parsing.
    pub diagnostics: Vec<Diagnostic>,
    /// Records received.
    pub records: usize,
    /// Records dropped for having fewer than three tokens.
    pub malformed: usize,
    /// Stopped because the host asked to cancel.
    pub cancelled: bool,
}

/// Turns raw records into typed primitives.
pub struct PrimitiveParser<'a> {
    config: &'a LoaderConfig,
    host: &'a dyn LoadHost,
    tolerance: Tolerance,
    extractor: BoundaryExtractor,
}

impl<'a> PrimitiveParser<'a> {
    /// Create a parser.
    pub fn new(config: &'a LoaderConfig, host: &'a dyn LoadHost) -> Self {
        let tolerance = config.tolerance();
        Self {
            config,
            host,
            tolerance,
            extractor: BoundaryExtractor::new(tolerance),
        }
    }

    /// Parse records until the input ends or the host cancels.
    ///
    /// The record being parsed when cancellation is noticed is never
    /// half-applied: polling happens between records.
    pub fn run<I>(&self, records: I) -> ParseReport
    where
        I: IntoIterator<Item = PrimitiveRecord>,
    {
        let mut report = ParseReport::default();

        for record in records {
            if report.records % self.config.poll_interval == 0 && self.host.is_cancelled() {
                log::info!("Parsing cancelled after {} records", report.records);
                report.cancelled = true;
                self.host.abort();
                break;
            }
            report.records += 1;

            match self.parse(&record) {
                Ok(ParseOutcome::Primitive(primitive)) => report.primitives.push(primitive),
                Ok(ParseOutcome::Failed { wire, failure }) => {
                    let message = format!(
                        "{}:{}: {}; kept as wireframe",
                        record.source, record.line, failure
                    );
                    log::debug!("{}", message);
                    report.diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::GeometryConstructionFailure,
                        message,
                    ));
                    report.wireframes.push(wire);
                }
                Err(RecordError::TooFewTokens { count }) => {
                    log::debug!(
                        "{}:{}: dropping record with {} tokens",
                        record.source,
                        record.line,
                        count
                    );
                    report.malformed += 1;
                }
                Err(err) => {
                    let message = format!("{}:{}: {}", record.source, record.line, err);
                    log::debug!("{}", message);
                    report
                        .diagnostics
                        .push(Diagnostic::warning(DiagnosticKind::InvalidRecord, message));
                }
            }
        }

        log::info!(
            "Parsed {} records into {} primitives ({} wireframes, {} malformed)",
            report.records,
            report.primitives.len(),
            report.wireframes.len(),
            report.malformed
        );
        report
    }

    /// Parse a single record.
    pub fn parse(&self, record: &PrimitiveRecord) -> Result<ParseOutcome, RecordError> {
        let tokens = tokenize(&record.text);
        if tokens.len() < 3 {
            return Err(RecordError::TooFewTokens {
                count: tokens.len(),
            });
        }

        let header = PrimitiveHeader {
            modifier: tokens[0].to_string(),
            type_name: tokens[1].to_string(),
            name: tokens[2].to_string(),
            source: Arc::clone(&record.source),
            line: record.line,
        };

        let outcome = match header.type_name.as_str() {
            "polygon" => {
                let reals = parse_reals(&header, &tokens)?;
                self.parse_polygon(header, &reals)
            }
            "sphere" => {
                let reals = parse_reals(&header, &tokens)?;
                if reals.len() != 4 {
                    return Err(RecordError::SphereArguments {
                        name: header.name,
                        count: reals.len(),
                    });
                }
                ParseOutcome::Primitive(Primitive::Sphere(SpherePrimitive {
                    center: Point3::new(reals[0], reals[1], reals[2]),
                    radius: reals[3],
                    header,
                }))
            }
            _ => ParseOutcome::Primitive(Primitive::Material(MaterialDef {
                definition: definition_text(&tokens),
                header,
            })),
        };
        Ok(outcome)
    }

    fn parse_polygon(&self, header: PrimitiveHeader, reals: &[f64]) -> ParseOutcome {
        if reals.len() % 3 != 0 {
            log::debug!(
                "{}: {} trailing values ignored on polygon {}",
                header.location(),
                reals.len() % 3,
                header.name
            );
        }
        let vertices: Vec<Point3> = reals
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();

        match build_polygon_mesh(&vertices, &self.extractor, &self.tolerance) {
            Ok(mesh) => ParseOutcome::Primitive(Primitive::Polygon(PolygonPrimitive {
                header,
                vertices,
                mesh,
            })),
            Err(source) => ParseOutcome::Failed {
                wire: DiagnosticWire {
                    name: header.name.clone(),
                    modifier: header.modifier.clone(),
                    source: Arc::clone(&header.source),
                    line: header.line,
                    curves: self.extractor.extract(&vertices),
                },
                failure: GeometryConstructionFailure {
                    name: header.name,
                    source,
                },
            },
        }
    }
}

/// Read every token after the counts as a real.
fn parse_reals(header: &PrimitiveHeader, tokens: &[&str]) -> Result<Vec<f64>, RecordError> {
    let counts = &tokens[3..tokens.len().min(FIRST_REAL)];
    if counts.iter().take(2).any(|c| *c != "0") {
        log::debug!(
            "{}: {} {} has string or integer arguments, reading them as reals",
            header.location(),
            header.type_name,
            header.name
        );
    }

    let reals = tokens
        .iter()
        .skip(FIRST_REAL)
        .map(|token| {
            token.parse::<f64>().map_err(|_| RecordError::InvalidNumber {
                type_name: header.type_name.clone(),
                name: header.name.clone(),
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(declared) = counts.get(2).and_then(|c| c.parse::<usize>().ok()) {
        if declared != reals.len() {
            log::debug!(
                "{}: {} declares {} reals, found {}",
                header.location(),
                header.name,
                declared,
                reals.len()
            );
        }
    }
    Ok(reals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CancellationToken, NoopHost};

    fn record(text: &str) -> PrimitiveRecord {
        PrimitiveRecord {
            text: text.to_string(),
            source: Arc::from("test.rad"),
            line: 1,
        }
    }

    fn parse(text: &str) -> Result<ParseOutcome, RecordError> {
        let config = LoaderConfig::default();
        PrimitiveParser::new(&config, &NoopHost).parse(&record(text))
    }

    fn polygon(text: &str) -> PolygonPrimitive {
        match parse(text) {
            Ok(ParseOutcome::Primitive(Primitive::Polygon(p))) => p,
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_drops_empty_tokens() {
        assert_eq!(tokenize("  a \t b\n\nc  "), ["a", "b", "c"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_triangle_and_quad() {
        let tri = polygon("m polygon t 0 0 9 0 0 0 1 0 0 0 1 0");
        assert_eq!(tri.mesh.num_faces(), 1);
        assert_eq!(tri.mesh.num_triangles(), 1);

        let quad = polygon("m polygon q 0 0 12 0 0 0 1 0 0 1 0 1 0 0 1");
        assert_eq!(quad.mesh.num_faces(), 1);
        assert_eq!(quad.mesh.num_quads(), 1);
        assert_eq!(quad.header.modifier, "m");
        assert_eq!(quad.vertices.len(), 4);
    }

    #[test]
    fn test_large_polygon_is_filled() {
        // Regular hexagon in the XY plane
        let mut text = String::from("m polygon hex 0 0 18");
        for i in 0..6 {
            let t = i as f64 * std::f64::consts::PI / 3.0;
            text.push_str(&format!(" {} {} 0", t.cos(), t.sin()));
        }
        let hex = polygon(&text);
        assert_eq!(hex.mesh.num_triangles(), 4);
        assert_eq!(hex.vertices.len(), 6);
    }

    #[test]
    fn test_fan_with_doubled_diagonal() {
        // Square walked as two triangles sharing the diagonal
        let p = polygon("m polygon sq 0 0 18 0 0 0 1 0 0 1 1 0 0 0 0 1 1 0 0 1 0");
        assert_eq!(p.mesh.num_triangles(), 2);
        assert_eq!(p.vertices.len(), 6);
    }

    #[test]
    fn test_non_planar_polygon_keeps_wireframe() {
        let outcome = parse("m polygon bent 0 0 15 0 0 0 1 0 0 2 1 0 1 2 1 0 1 0").unwrap();
        match outcome {
            ParseOutcome::Failed { wire, failure } => {
                assert_eq!(wire.name, "bent");
                assert_eq!(wire.modifier, "m");
                assert_eq!(wire.curves.len(), 1);
                assert_eq!(wire.curves[0].segment_count(), 5);
                assert!(matches!(failure.source, SurfaceError::NonPlanar { .. }));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_points_is_geometry_failure() {
        let outcome = parse("m polygon short 0 0 6 0 0 0 1 0 0").unwrap();
        assert!(matches!(
            outcome,
            ParseOutcome::Failed {
                failure: GeometryConstructionFailure {
                    source: SurfaceError::TooFewPoints { count: 2 },
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn test_sphere() {
        match parse("void sphere ball 0 0 4 1 2 3 0.5").unwrap() {
            ParseOutcome::Primitive(Primitive::Sphere(s)) => {
                assert_eq!(s.center, Point3::new(1.0, 2.0, 3.0));
                assert_eq!(s.radius, 0.5);
            }
            other => panic!("expected sphere, got {:?}", other),
        }
        assert_eq!(
            parse("void sphere ball 0 0 3 1 2 3"),
            Err(RecordError::SphereArguments {
                name: "ball".into(),
                count: 3
            })
        );
    }

    #[test]
    fn test_material_definition_text() {
        match parse("void glass GlassMat 0 0 3 0.960 0.960 0.960").unwrap() {
            ParseOutcome::Primitive(Primitive::Material(m)) => {
                assert_eq!(m.header.name, "GlassMat");
                assert_eq!(m.header.type_name, "glass");
                assert_eq!(m.definition, "void glass GlassMat\n0\n0\n3 0.960 0.960 0.960");
            }
            other => panic!("expected material, got {:?}", other),
        }
    }

    #[test]
    fn test_short_material_text() {
        assert_eq!(definition_text(&["void", "plastic", "p"]), "void plastic p");
        assert_eq!(definition_text(&["void", "plastic", "p", "0"]), "void plastic p\n0");
    }

    #[test]
    fn test_other_geometry_becomes_material_text() {
        match parse("m cone c 0 0 8 0 0 0 0 0 1 1 0").unwrap() {
            ParseOutcome::Primitive(Primitive::Material(m)) => {
                assert_eq!(m.definition, "m cone c\n0\n0\n8 0 0 0 0 0 1 1 0");
            }
            other => panic!("expected material text, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_and_invalid() {
        assert_eq!(parse("m polygon"), Err(RecordError::TooFewTokens { count: 2 }));
        assert!(matches!(
            parse("m polygon p 0 0 9 0 0 x 1 0 0 0 1 0"),
            Err(RecordError::InvalidNumber { token, .. }) if token == "x"
        ));
    }

    #[test]
    fn test_run_collects_outcomes() {
        let config = LoaderConfig::default();
        let records = vec![
            record("m polygon a 0 0 9 0 0 0 1 0 0 0 1 0"),
            record("junk"),
            record("m polygon bad 0 0 9 0 0 0 1 0 0 0 q 0"),
            record("m polygon bent 0 0 15 0 0 0 1 0 0 2 1 0 1 2 1 0 1 0"),
            record("void plastic m 0 0 5 1 1 1 0 0"),
        ];
        let report = PrimitiveParser::new(&config, &NoopHost).run(records);
        assert_eq!(report.records, 5);
        assert_eq!(report.primitives.len(), 2);
        assert_eq!(report.wireframes.len(), 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::InvalidRecord);
        assert_eq!(
            report.diagnostics[1].kind,
            DiagnosticKind::GeometryConstructionFailure
        );
        assert!(!report.cancelled);
    }

    #[test]
    fn test_run_cancelled() {
        let config = LoaderConfig::default();
        let token = CancellationToken::new();
        token.cancel();
        let report = PrimitiveParser::new(&config, &token)
            .run(vec![record("m polygon a 0 0 9 0 0 0 1 0 0 0 1 0")]);
        assert!(report.cancelled);
        assert!(report.primitives.is_empty());
        assert_eq!(report.records, 0);
    }
}

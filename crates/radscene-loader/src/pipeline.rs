//! Two-worker load pipeline.
//!
//! The ingestor and the parser run on scoped threads joined by a bounded
//! channel. Dropping the sender is the completion signal. Aggregation runs
//! on the calling thread once both workers have been joined.

use std::path::Path;
use std::sync::mpsc;
use std::thread;

use serde::Serialize;

use crate::color::SessionContext;
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::graph::{ObjectGraphBuilder, SceneGraph};
use crate::host::LoadHost;
use crate::ingest::{FileIngestor, SceneSource};
use crate::lexer::PrimitiveRecord;
use crate::parser::PrimitiveParser;

/// Counters from a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Non-blank, non-comment lines read.
    pub lines_read: usize,
    /// Records emitted by the ingestor.
    pub records: usize,
    /// Primitives parsed (geometry and materials).
    pub primitives: usize,
    /// Records dropped for having fewer than three tokens.
    pub malformed: usize,
    /// External references skipped.
    pub references: usize,
    /// Polygons kept only as wireframes.
    pub failures: usize,
}

/// Result of [`SceneLoader::load`].
#[derive(Debug)]
pub struct LoadOutcome {
    /// The scene graph, possibly partial if cancelled.
    pub graph: SceneGraph,
    /// True if either worker stopped on cancellation.
    pub cancelled: bool,
    /// Counters.
    pub stats: LoadStats,
}

/// Loads scene sources into a [`SceneGraph`].
#[derive(Debug, Clone, Default)]
pub struct SceneLoader {
    config: LoaderConfig,
}

impl SceneLoader {
    /// Create a loader with a validated configuration.
    pub fn new(config: LoaderConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The loader's configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load files from disk.
    pub fn load_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        host: &dyn LoadHost,
        session: &mut SessionContext,
    ) -> Result<LoadOutcome, LoadError> {
        let sources: Vec<SceneSource> = paths
            .iter()
            .map(|p| SceneSource::File(p.as_ref().to_path_buf()))
            .collect();
        self.load(&sources, host, session)
    }

    /// Load sources in order.
    ///
    /// Blocks until both workers finish, then aggregates. Every unique
    /// diagnostic is passed to `host.report` before returning.
    pub fn load(
        &self,
        sources: &[SceneSource],
        host: &dyn LoadHost,
        session: &mut SessionContext,
    ) -> Result<LoadOutcome, LoadError> {
        let config = &self.config;
        let (tx, rx) = mpsc::sync_channel::<PrimitiveRecord>(config.queue_capacity);

        let (ingest, parse) = thread::scope(|scope| {
            let producer = scope.spawn(move || {
                FileIngestor::new(config, host).run(sources, |record| tx.send(record).is_ok())
            });
            let consumer = scope.spawn(move || PrimitiveParser::new(config, host).run(rx));
            (producer.join(), consumer.join())
        });
        let ingest = ingest.map_err(|_| LoadError::WorkerPanicked("ingest"))?;
        let parse = parse.map_err(|_| LoadError::WorkerPanicked("parse"))?;

        let cancelled = ingest.cancelled || parse.cancelled;
        let stats = LoadStats {
            lines_read: ingest.lines_read,
            records: ingest.records,
            primitives: parse.primitives.len(),
            malformed: parse.malformed,
            references: ingest.references,
            failures: parse.wireframes.len(),
        };

        let mut upstream = ingest.diagnostics;
        upstream.extend(parse.diagnostics);
        let graph = ObjectGraphBuilder::new(config, session).build(
            parse.primitives,
            parse.wireframes,
            upstream,
        )?;

        for diagnostic in graph.diagnostics() {
            host.report(diagnostic);
        }

        Ok(LoadOutcome {
            graph,
            cancelled,
            stats,
        })
    }
}

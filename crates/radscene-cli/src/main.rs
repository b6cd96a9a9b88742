//! radscene CLI - scene loader front end
//!
//! Loads lighting-simulation scene files, prints what was found and exports
//! the preview geometry.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use radscene_loader::{
    Diagnostic, LoadHost, LoadOutcome, LoaderConfig, SceneLoader, SceneSummary, SessionContext,
    Severity,
};
use radscene_tessellate::TriangleMesh;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "radscene")]
#[command(about = "Load and preview lighting-simulation scene files", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load scene files and print a summary
    Load {
        /// Scene files, loaded in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Loader configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the merged preview geometry as binary STL
    Export {
        /// Scene files, loaded in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output .stl file
        #[arg(short, long)]
        output: PathBuf,
        /// Loader configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Load scene files and fail if anything was reported
    Check {
        /// Scene files, loaded in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Loader configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Prints diagnostics to stderr as they are reported.
struct ConsoleHost;

impl LoadHost for ConsoleHost {
    fn report(&self, diagnostic: &Diagnostic) {
        eprintln!("{}", diagnostic);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Load {
            files,
            config,
            json,
        } => {
            let outcome = load_scene(&files, config.as_deref())?;
            let summary = SceneSummary::new(&outcome);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Export {
            files,
            output,
            config,
        } => {
            let outcome = load_scene(&files, config.as_deref())?;
            export_stl(&outcome.graph.preview_mesh(), &output)?;
        }
        Commands::Check { files, config } => {
            let outcome = load_scene(&files, config.as_deref())?;
            check_scene(&outcome)?;
        }
    }

    Ok(())
}

fn load_scene(files: &[PathBuf], config: Option<&Path>) -> Result<LoadOutcome> {
    let config = match config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    let loader = SceneLoader::new(config)?;
    let mut session = SessionContext::new();
    let outcome = loader.load_files(files, &ConsoleHost, &mut session)?;
    log::info!(
        "Loaded {} files: {} primitives in {} collections",
        files.len(),
        outcome.graph.num_primitives(),
        outcome.graph.num_collections()
    );
    Ok(outcome)
}

fn print_summary(summary: &SceneSummary) {
    println!(
        "Scene: {} collections, {} materials, {} wireframes",
        summary.collections.len(),
        summary.materials.len(),
        summary.wireframes.len()
    );

    if !summary.collections.is_empty() {
        println!("\nCollections:");
        for c in &summary.collections {
            println!(
                "  {} ({}): {} members, {} faces, material: {}",
                c.modifier,
                c.color,
                c.members,
                c.faces,
                c.material.as_deref().unwrap_or("none")
            );
            if let Some(text) = &c.material_text {
                for line in text.lines() {
                    println!("      {}", line);
                }
            }
        }
    }

    if !summary.materials.is_empty() {
        println!("\nMaterials:");
        for m in &summary.materials {
            println!("  {} ({})", m.name, m.type_name);
        }
    }

    if !summary.wireframes.is_empty() {
        println!("\nWireframes:");
        for w in &summary.wireframes {
            println!(
                "  {} [{}] at {}: {} curves, {} segments",
                w.name, w.modifier, w.location, w.curves, w.segments
            );
        }
    }

    if let Some(b) = &summary.bounds {
        println!("\nBounds:");
        println!("  Min: {:?}", b.min);
        println!("  Max: {:?}", b.max);
        println!("  Diagonal: {:.4}", b.diagonal);
    }

    let s = &summary.stats;
    println!("\nStats:");
    println!("  Lines read: {}", s.lines_read);
    println!("  Records: {}", s.records);
    println!("  Primitives: {}", s.primitives);
    println!("  Skipped references: {}", s.references);
    println!("  Malformed records: {}", s.malformed);
    println!("  Wireframe fallbacks: {}", s.failures);
    println!("  Diagnostics: {}", summary.diagnostics.len());
}

fn check_scene(outcome: &LoadOutcome) -> Result<()> {
    let count = |severity: Severity| {
        outcome
            .graph
            .diagnostics()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let warnings = count(Severity::Warning);
    let errors = count(Severity::Error);
    if warnings + errors > 0 {
        anyhow::bail!("{} warning(s), {} error(s)", warnings, errors);
    }
    println!(
        "OK: {} primitives in {} collections",
        outcome.graph.num_primitives(),
        outcome.graph.num_collections()
    );
    Ok(())
}

fn export_stl(mesh: &TriangleMesh, output: &Path) -> Result<()> {
    if mesh.num_triangles() == 0 {
        anyhow::bail!("Scene has no preview geometry to export");
    }
    let stl_bytes = export_stl_bytes(&mesh.vertices, &mesh.indices)?;
    std::fs::write(output, stl_bytes)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Exported {} triangles to {}",
        mesh.num_triangles(),
        output.display()
    );
    Ok(())
}

fn export_stl_bytes(vertices: &[f32], indices: &[u32]) -> Result<Vec<u8>> {
    let num_triangles = indices.len() / 3;
    let count = u32::try_from(num_triangles).context("too many triangles for STL")?;
    let mut data = Vec::with_capacity(84 + num_triangles * 50);

    // 80-byte header
    let mut header = [b' '; 80];
    let title = b"radscene preview export";
    header[..title.len()].copy_from_slice(title);
    data.extend_from_slice(&header);
    data.extend_from_slice(&count.to_le_bytes());

    for tri in indices.chunks_exact(3) {
        let corner = |i: u32| -> Result<[f32; 3]> {
            let at = i as usize * 3;
            vertices
                .get(at..at + 3)
                .map(|v| [v[0], v[1], v[2]])
                .with_context(|| format!("index {} out of range", i))
        };
        let v0 = corner(tri[0])?;
        let v1 = corner(tri[1])?;
        let v2 = corner(tri[2])?;

        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let nx = e1[1] * e2[2] - e1[2] * e2[1];
        let ny = e1[2] * e2[0] - e1[0] * e2[2];
        let nz = e1[0] * e2[1] - e1[1] * e2[0];
        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        let (nx, ny, nz) = if len > 1e-10 {
            (nx / len, ny / len, nz / len)
        } else {
            (0.0, 0.0, 1.0)
        };

        for c in [nx, ny, nz] {
            data.extend_from_slice(&c.to_le_bytes());
        }
        for v in [v0, v1, v2] {
            for c in v {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        // Attribute byte count
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(data)
}

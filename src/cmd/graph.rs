//! Graph command implementation for ERD generation.

use super::io_util::{load_input, parse_arg, parse_patterns, write_output};
use crate::convert::convert;
use crate::document::LoadedSchema;
use crate::graph::{conceptual_to_mermaid, to_dot, to_json, to_mermaid, GraphView, Layout, OutputFormat};
use crate::schema::SchemaGraph;
use ahash::AHashSet;
use anyhow::{bail, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run the graph command
#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    tables: Option<String>,
    exclude: Option<String>,
    cycles_only: bool,
    layout: Option<String>,
    render: bool,
    logical: bool,
) -> Result<()> {
    let render_ext = output
        .as_deref()
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| matches!(e.as_str(), "png" | "svg" | "pdf"));

    let format = match (&format, &output) {
        (Some(f), _) => parse_arg(f)?,
        (None, _) if render_ext.is_some() => OutputFormat::Dot,
        (None, Some(out)) => out
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
            .unwrap_or_default(),
        (None, None) => OutputFormat::default(),
    };

    let layout: Layout = match layout {
        Some(l) => parse_arg(&l)?,
        None => Layout::default(),
    };

    let schema = match load_input(&file)? {
        LoadedSchema::Conceptual(conceptual) if !logical => {
            if format != OutputFormat::Mermaid {
                bail!(
                    "conceptual schemas render to mermaid only; pass --logical for {} output",
                    format
                );
            }
            if tables.is_some() || exclude.is_some() || cycles_only {
                eprintln!("Note: table filters apply to logical diagrams only, ignoring them");
            }
            let content = conceptual_to_mermaid(&conceptual);
            write_output(output.as_deref(), &content, "ERD")?;
            eprintln!(
                "\nMCD: {} entities, {} associations",
                conceptual.entity_count(),
                conceptual.association_count()
            );
            return Ok(());
        }
        LoadedSchema::Conceptual(conceptual) => convert(&conceptual)?.schema,
        LoadedSchema::Logical(schema) => schema,
    };

    let mut view = GraphView::from_schema(&schema);
    view.filter_tables(&parse_patterns(tables.as_deref())?);
    view.exclude_tables(&parse_patterns(exclude.as_deref())?);

    let cycles = if cycles_only {
        let cycles = SchemaGraph::from_schema(&schema).cycles();
        let cyclic: AHashSet<String> = cycles.iter().flatten().cloned().collect();
        view.retain_tables(&cyclic);
        Some(cycles)
    } else {
        None
    };

    let content = match format {
        OutputFormat::Mermaid => to_mermaid(&view),
        OutputFormat::Dot => to_dot(&view, layout),
        OutputFormat::Json => to_json(&view),
    };

    match (&output, render || render_ext.is_some()) {
        (Some(out_path), true) if format == OutputFormat::Dot => {
            render_with_graphviz(&content, out_path)?;
        }
        (None, true) => bail!("--render needs an output file (.png, .svg or .pdf)"),
        _ => write_output(output.as_deref(), &content, "ERD")?,
    }

    if let Some(cycles) = cycles {
        if cycles.is_empty() {
            eprintln!("\nNo cycles detected.");
        } else {
            eprintln!("\nCycles detected ({}):", cycles.len());
            for (i, cycle) in cycles.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, cycle.join(" <-> "));
            }
        }
    }

    if format != OutputFormat::Json {
        let total_columns: usize = view.sorted_tables().iter().map(|t| t.columns.len()).sum();
        eprintln!(
            "\nERD: {} tables, {} columns, {} relationships",
            view.table_count(),
            total_columns,
            view.edge_count()
        );
    }

    Ok(())
}

/// Render DOT to PNG/SVG/PDF using Graphviz
fn render_with_graphviz(dot_source: &str, output_path: &Path) -> Result<()> {
    let ext = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png");

    let mut child = Command::new("dot")
        .arg(format!("-T{}", ext))
        .arg("-o")
        .arg(output_path)
        .stdin(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!(
                    "Graphviz 'dot' command not found. Install Graphviz or write .dot output instead."
                )
            } else {
                anyhow::anyhow!("Failed to run dot: {}", e)
            }
        })?;

    if let Some(ref mut stdin) = child.stdin {
        stdin.write_all(dot_source.as_bytes())?;
    }
    // Close stdin so dot sees EOF
    drop(child.stdin.take());

    let status = child.wait()?;
    if !status.success() {
        bail!("Graphviz dot command failed with status: {}", status);
    }

    eprintln!("Rendered to: {}", output_path.display());
    Ok(())
}

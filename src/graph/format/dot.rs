//! Graphviz DOT format output for ERD diagrams.

use crate::graph::format::Layout;
use crate::graph::view::{EdgeCardinality, GraphView, TableInfo};

/// Generate DOT output with one HTML-like table per schema table
pub fn to_dot(view: &GraphView, layout: Layout) -> String {
    let mut output = String::new();

    output.push_str("digraph ERD {\n");
    output.push_str("  graph [pad=\"0.5\", nodesep=\"1\", ranksep=\"1.5\"];\n");

    let rankdir = match layout {
        Layout::LR => "LR",
        Layout::TB => "TB",
    };
    output.push_str(&format!("  rankdir={};\n", rankdir));
    output.push_str("  node [shape=none, margin=0];\n");
    output.push_str("  edge [dir=both, arrowhead=tee];\n\n");

    for table in view.sorted_tables() {
        output.push_str(&format!(
            "  {} [label=<{}>];\n",
            escape_dot_id(&table.name),
            table_label(table)
        ));
    }

    if !view.edges.is_empty() {
        output.push('\n');
    }

    for edge in &view.edges {
        let (arrowtail, style) = match edge.cardinality {
            EdgeCardinality::ManyToOne => ("crow", "solid"),
            EdgeCardinality::ManyToZeroOrOne => ("crow", "dashed"),
            EdgeCardinality::OneToOne => ("tee", "solid"),
            EdgeCardinality::OneToZeroOrOne => ("tee", "dashed"),
        };
        output.push_str(&format!(
            "  {}:{} -> {}:{} [label=\"{}\", arrowtail={}, style={}];\n",
            escape_dot_id(&edge.from_table),
            escape_dot_id(&edge.from_column),
            escape_dot_id(&edge.to_table),
            escape_dot_id(&edge.to_column),
            edge.constraint.replace('"', "\\\""),
            arrowtail,
            style
        ));
    }

    output.push_str("}\n");
    output
}

fn table_label(table: &TableInfo) -> String {
    let mut html = String::new();

    html.push_str("<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"4\">");
    html.push_str(&format!(
        "<TR><TD BGCOLOR=\"#2d3748\" COLSPAN=\"3\"><FONT COLOR=\"white\"><B>{}</B></FONT></TD></TR>",
        escape_html(&table.name)
    ));

    for col in &table.columns {
        let mut keys = Vec::new();
        if col.is_primary_key {
            keys.push("PK");
        }
        if col.is_foreign_key {
            keys.push("FK");
        }
        if col.is_unique && !col.is_primary_key {
            keys.push("UQ");
        }

        let null_marker = if col.is_nullable {
            " <FONT COLOR=\"#888888\">NULL</FONT>"
        } else {
            ""
        };

        html.push_str("<TR>");
        html.push_str(&format!(
            "<TD ALIGN=\"LEFT\" PORT=\"{}\">{}{}</TD>",
            escape_html(&col.name),
            escape_html(&col.name),
            null_marker
        ));
        html.push_str(&format!(
            "<TD ALIGN=\"LEFT\"><FONT COLOR=\"#666666\">{}</FONT></TD>",
            escape_html(&col.col_type)
        ));
        html.push_str(&format!("<TD ALIGN=\"CENTER\">{}</TD>", keys.join(" ")));
        html.push_str("</TR>");
    }

    html.push_str("</TABLE>");
    html
}

/// Escape a string for use in DOT HTML labels
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape a string for use as a DOT node ID
fn escape_dot_id(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

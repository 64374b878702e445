//! Mermaid erDiagram format output.

use crate::conceptual::{Association, Attribute, Cardinality, ConceptualSchema, MaxBound, MinBound};
use crate::graph::view::GraphView;

/// Generate a Mermaid erDiagram from a graph view
pub fn to_mermaid(view: &GraphView) -> String {
    let mut output = String::from("erDiagram\n");

    for table in view.sorted_tables() {
        output.push_str(&format!("    {} {{\n", escape_mermaid_id(&table.name)));

        for col in &table.columns {
            let mut keys = Vec::new();
            if col.is_primary_key {
                keys.push("PK");
            }
            if col.is_foreign_key {
                keys.push("FK");
            }
            if col.is_unique && !col.is_primary_key {
                keys.push("UK");
            }
            push_attribute_line(&mut output, &col.col_type, &col.name, &keys.join(", "));
        }

        output.push_str("    }\n");
    }

    if !view.edges.is_empty() {
        output.push('\n');
    }

    for edge in &view.edges {
        output.push_str(&format!(
            "    {} {} {} : \"{}\"\n",
            escape_mermaid_id(&edge.from_table),
            edge.cardinality.as_mermaid(),
            escape_mermaid_id(&edge.to_table),
            edge.from_column
        ));
    }

    output
}

/// Generate a Mermaid erDiagram from a conceptual schema.
///
/// Binary associations without attributes become labelled relationships.
/// Other associations become their own node, linked to every participant.
pub fn conceptual_to_mermaid(schema: &ConceptualSchema) -> String {
    let mut output = String::from("erDiagram\n");

    for entity in schema.entities() {
        push_node(&mut output, &entity.name, &entity.attributes);
    }

    let (simple, reified): (Vec<&Association>, Vec<&Association>) = schema
        .associations()
        .map(|(_, a)| a)
        .partition(|a| a.participants.len() == 2 && a.attributes.is_empty());

    for assoc in &reified {
        push_node(&mut output, &assoc.name, &assoc.attributes);
    }

    if !simple.is_empty() || !reified.is_empty() {
        output.push('\n');
    }

    for assoc in simple {
        let (a, b) = (&assoc.participants[0], &assoc.participants[1]);
        // Each side's marker comes from the other side's cardinality
        output.push_str(&format!(
            "    {} {}--{} {} : \"{}\"\n",
            escape_mermaid_id(&a.entity),
            left_marker(b.cardinality),
            right_marker(a.cardinality),
            escape_mermaid_id(&b.entity),
            assoc.name
        ));
    }

    for assoc in reified {
        for slot in &assoc.participants {
            output.push_str(&format!(
                "    {} {}--|| {} : \"{}\"\n",
                escape_mermaid_id(&assoc.name),
                left_marker(slot.cardinality),
                escape_mermaid_id(&slot.entity),
                slot.role.as_deref().unwrap_or(&assoc.name)
            ));
        }
    }

    output
}

fn push_node(output: &mut String, name: &str, attributes: &[Attribute]) {
    output.push_str(&format!("    {} {{\n", escape_mermaid_id(name)));
    for attr in attributes {
        let key = if attr.identifier { "PK" } else { "" };
        push_attribute_line(output, &attr.attr_type, &attr.name, key);
    }
    output.push_str("    }\n");
}

fn push_attribute_line(output: &mut String, ty: &str, name: &str, keys: &str) {
    let ty = escape_mermaid_type(ty);
    let name = escape_mermaid_id(name);
    if keys.is_empty() {
        output.push_str(&format!("        {} {}\n", ty, name));
    } else {
        output.push_str(&format!("        {} {} {}\n", ty, name, keys));
    }
}

fn left_marker(card: Cardinality) -> &'static str {
    match (card.min(), card.max()) {
        (MinBound::Zero, MaxBound::One) => "|o",
        (MinBound::One, MaxBound::One) => "||",
        (MinBound::Zero, MaxBound::Many) => "}o",
        (MinBound::One, MaxBound::Many) => "}|",
    }
}

fn right_marker(card: Cardinality) -> &'static str {
    match (card.min(), card.max()) {
        (MinBound::Zero, MaxBound::One) => "o|",
        (MinBound::One, MaxBound::One) => "||",
        (MinBound::Zero, MaxBound::Many) => "o{",
        (MinBound::One, MaxBound::Many) => "|{",
    }
}

/// Mermaid IDs are alphanumeric with underscores
fn escape_mermaid_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Mermaid types cannot carry spaces or parameters
fn escape_mermaid_type(s: &str) -> String {
    let base = match s.find('(') {
        Some(paren_pos) => &s[..paren_pos],
        None => s,
    };
    escape_mermaid_id(base.trim())
}

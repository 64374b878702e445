//! Schema dependency graph for FK-aware ordering.
//!
//! Provides:
//! - Dependency graph construction from foreign-key relationships
//! - Pass-based topological ordering with stable, insertion-order tie-breaking
//! - Cycle reporting (Tarjan SCC) when no valid order exists

use super::{DanglingReference, DatabaseSchema, TableId};
use crate::error::{Result, SchemaError};
use ahash::AHashMap;
use serde::Serialize;
use tracing::debug;

/// Dependency graph built from foreign key relationships.
///
/// A parent is a table referenced by another table's FK; a child is a table
/// holding such an FK. Self-references are left out of the graph, and so are
/// FKs pointing at tables the schema does not contain (those are kept in
/// `unresolved` instead).
#[derive(Debug)]
pub struct SchemaGraph<'a> {
    schema: &'a DatabaseSchema,
    /// For each table, the tables it references
    pub parents: Vec<Vec<TableId>>,
    /// For each table, the tables referencing it
    pub children: Vec<Vec<TableId>>,
    /// Foreign keys that do not resolve inside the schema
    pub unresolved: Vec<DanglingReference>,
}

/// Result of a successful topological sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct TopoOrder {
    /// Table names, referenced tables first
    pub order: Vec<String>,
    /// Tables grouped by the pass that placed them
    pub levels: Vec<Vec<String>>,
    /// Dangling references found while building the graph
    pub unresolved: Vec<DanglingReference>,
}

impl<'a> SchemaGraph<'a> {
    /// Build a dependency graph from a schema
    pub fn from_schema(schema: &'a DatabaseSchema) -> Self {
        let n = schema.len();
        let mut parents: Vec<Vec<TableId>> = vec![Vec::new(); n];
        let mut children: Vec<Vec<TableId>> = vec![Vec::new(); n];

        for (i, table) in schema.tables().enumerate() {
            let child_id = TableId(i as u32);

            for fk in &table.foreign_keys {
                let Some(parent_id) = schema.get_table_id(&fk.referenced_table) else {
                    continue;
                };
                if parent_id == child_id {
                    continue;
                }
                if !parents[child_id.0 as usize].contains(&parent_id) {
                    parents[child_id.0 as usize].push(parent_id);
                }
                if !children[parent_id.0 as usize].contains(&child_id) {
                    children[parent_id.0 as usize].push(child_id);
                }
            }
        }

        Self {
            schema,
            parents,
            children,
            unresolved: schema.unresolved_references(),
        }
    }

    /// Get the number of tables in the graph
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Get the table name for a table ID
    pub fn table_name(&self, id: TableId) -> Option<&'a str> {
        self.schema.table(id).map(|t| t.name.as_str())
    }

    /// Order tables so that every table follows the tables it references.
    ///
    /// Each pass places every remaining table whose parents were all placed
    /// before the pass started, scanning in insertion order. A pass that
    /// places nothing means the remaining tables contain a cycle.
    pub fn topo_sort(&self) -> Result<TopoOrder> {
        let n = self.len();
        let mut placed = vec![false; n];
        let mut remaining: Vec<TableId> = (0..n).map(|i| TableId(i as u32)).collect();
        let mut order = Vec::with_capacity(n);
        let mut levels = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<TableId> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    self.parents[id.0 as usize]
                        .iter()
                        .all(|p| placed[p.0 as usize])
                })
                .collect();

            if ready.is_empty() {
                return Err(self.circular_reference(&remaining));
            }

            let mut level = Vec::with_capacity(ready.len());
            for id in &ready {
                placed[id.0 as usize] = true;
                if let Some(name) = self.table_name(*id) {
                    order.push(name.to_string());
                    level.push(name.to_string());
                }
            }
            remaining.retain(|id| !placed[id.0 as usize]);

            debug!(
                pass = levels.len(),
                placed = level.len(),
                remaining = remaining.len(),
                "dependency pass"
            );
            levels.push(level);
        }

        Ok(TopoOrder {
            order,
            levels,
            unresolved: self.unresolved.clone(),
        })
    }

    /// Every multi-table cycle in the graph, one entry per strongly connected
    /// component, tables in schema order.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let all: Vec<TableId> = (0..self.len()).map(|i| TableId(i as u32)).collect();
        self.cyclic_components(&all)
            .into_iter()
            .map(|scc| self.names(&scc))
            .collect()
    }

    fn circular_reference(&self, remaining: &[TableId]) -> SchemaError {
        let mut cyclic: Vec<TableId> = self
            .cyclic_components(remaining)
            .into_iter()
            .flatten()
            .collect();
        cyclic.sort();

        let blocked: Vec<TableId> = remaining
            .iter()
            .copied()
            .filter(|id| !cyclic.contains(id))
            .collect();

        SchemaError::CircularReference {
            tables: self.names(&cyclic),
            blocked: self.names(&blocked),
        }
    }

    fn names(&self, ids: &[TableId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.table_name(*id).map(|s| s.to_string()))
            .collect()
    }

    /// Strongly connected components with two or more members, restricted to
    /// the given subset of tables.
    fn cyclic_components(&self, subset: &[TableId]) -> Vec<Vec<TableId>> {
        let mut tarjan = Tarjan::new(self, subset);
        for &id in subset {
            if !tarjan.index.contains_key(&id) {
                tarjan.strongconnect(id);
            }
        }

        let mut sccs: Vec<Vec<TableId>> = tarjan
            .sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        sccs.sort();
        sccs
    }
}

/// Tarjan's strongly connected components over table IDs
struct Tarjan<'g, 'a> {
    graph: &'g SchemaGraph<'a>,
    in_subset: Vec<bool>,
    counter: usize,
    stack: Vec<TableId>,
    on_stack: Vec<bool>,
    index: AHashMap<TableId, usize>,
    lowlink: AHashMap<TableId, usize>,
    sccs: Vec<Vec<TableId>>,
}

impl<'g, 'a> Tarjan<'g, 'a> {
    fn new(graph: &'g SchemaGraph<'a>, subset: &[TableId]) -> Self {
        let mut in_subset = vec![false; graph.len()];
        for id in subset {
            in_subset[id.0 as usize] = true;
        }
        Self {
            graph,
            in_subset,
            counter: 0,
            stack: Vec::new(),
            on_stack: vec![false; graph.len()],
            index: AHashMap::new(),
            lowlink: AHashMap::new(),
            sccs: Vec::new(),
        }
    }

    fn strongconnect(&mut self, v: TableId) {
        self.index.insert(v, self.counter);
        self.lowlink.insert(v, self.counter);
        self.counter += 1;
        self.stack.push(v);
        self.on_stack[v.0 as usize] = true;

        let graph = self.graph;
        for &w in &graph.parents[v.0 as usize] {
            if !self.in_subset[w.0 as usize] {
                continue;
            }
            if !self.index.contains_key(&w) {
                self.strongconnect(w);
                let low = self.lowlink[&v].min(self.lowlink[&w]);
                self.lowlink.insert(v, low);
            } else if self.on_stack[w.0 as usize] {
                let low = self.lowlink[&v].min(self.index[&w]);
                self.lowlink.insert(v, low);
            }
        }

        if self.lowlink[&v] == self.index[&v] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w.0 as usize] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}

/// Table names of `schema` in dependency order.
///
/// Fails with [`SchemaError::CircularReference`] when the FK graph (ignoring
/// self-references) has a cycle.
pub fn dependency_order(schema: &DatabaseSchema) -> Result<Vec<String>> {
    SchemaGraph::from_schema(schema)
        .topo_sort()
        .map(|result| result.order)
}

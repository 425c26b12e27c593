//! Bundle dependency graph with incremental cycle detection.
//!
//! The graph owns every [`BundleUnit`] in a petgraph arena. An edge `A → B`
//! means bundle `A` depends on bundle `B`, so `B` must be emitted before `A`.
//!
//! Unlike a batch toposort, cycles are rejected at the moment the offending
//! edge is added: the edge is inserted tentatively, a three-color DFS runs from
//! its target and, if the DFS comes back to a vertex still on the stack, the
//! edge is removed again before [`AbmError::CircularDependency`] is returned.
//! The graph is therefore acyclic at all times.
//!
//! Node indices preserve insertion order and edge indices preserve
//! declaration order, which keeps every traversal deterministic.

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::core::{AbmError, AssetUnit, BundleUnit, normalize_name};

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Directed acyclic graph of bundles.
///
/// Lookups are case-insensitive: `"JQuery"` and `"jquery"` name the same
/// vertex. The vertex keeps the casing of its most recent definition.
#[derive(Debug, Clone, Default)]
pub struct BundleGraph {
    /// The underlying directed graph.
    graph: DiGraph<BundleUnit, ()>,
    /// Map from normalized bundle names to their graph indices.
    node_map: HashMap<String, NodeIndex>,
}

impl BundleGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the vertex for `name`.
    ///
    /// New vertices are empty placeholders until a loader defines them.
    pub fn add_vertex(&mut self, name: &str) -> NodeIndex {
        let key = normalize_name(name);
        if let Some(&index) = self.node_map.get(&key) {
            index
        } else {
            let index = self.graph.add_node(BundleUnit::new(name.trim()));
            self.node_map.insert(key, index);
            index
        }
    }

    /// Record that `from` depends on `to`.
    ///
    /// Both vertices are created if missing. Duplicate edges are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::CircularDependency`] when the edge would close a
    /// cycle. The edge is rolled back first, so the graph is unchanged apart
    /// from any vertices created by this call.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), AbmError> {
        let from_idx = self.add_vertex(from);
        let to_idx = self.add_vertex(to);

        if self.graph.contains_edge(from_idx, to_idx) {
            return Ok(());
        }

        let edge = self.graph.add_edge(from_idx, to_idx, ());

        if let Some(cycle) = self.find_cycle_from(to_idx) {
            self.rollback_edge(edge);
            let path: Vec<String> = cycle.into_iter().map(|idx| self.graph[idx].name.clone()).collect();
            tracing::debug!("Rejected edge {} -> {}: cycle {}", from, to, path.join(" → "));
            return Err(AbmError::CircularDependency {
                bundle: self.graph[from_idx].name.clone(),
                path,
            });
        }

        tracing::debug!("Added dependency edge {} -> {}", from, to);
        Ok(())
    }

    /// Remove a just-added edge.
    ///
    /// petgraph moves the last edge into the removed slot; the edge being
    /// rolled back is always the last one, so the remaining indices keep their
    /// declaration order.
    fn rollback_edge(&mut self, edge: EdgeIndex) {
        debug_assert_eq!(edge.index() + 1, self.graph.edge_count());
        self.graph.remove_edge(edge);
    }

    /// Three-color DFS rooted at `start`.
    ///
    /// Returns the cycle as `[v, ..., v]` when one is reachable.
    fn find_cycle_from(&self, start: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|idx| (idx, Color::White)).collect();
        let mut path = Vec::new();
        self.dfs_visit(start, &mut colors, &mut path)
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.ordered_children(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    // Truncate the stack at the repeated vertex
                    let cycle_start = path.iter().position(|&n| n == neighbor).unwrap_or(0);
                    let mut cycle = path[cycle_start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Outgoing neighbors in declaration order.
    fn ordered_children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> =
            self.graph.edges_directed(node, Direction::Outgoing).map(|e| (e.id(), e.target())).collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Incoming neighbors in declaration order.
    fn ordered_parents(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> =
            self.graph.edges_directed(node, Direction::Incoming).map(|e| (e.id(), e.source())).collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, source)| source).collect()
    }

    fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.node_map.get(&normalize_name(name)).copied()
    }

    /// Bundle names in dependency order for a single root.
    ///
    /// Dependencies come before dependents and `root` is always last. A root
    /// without dependencies yields `[root]`; an unknown root yields an empty
    /// vector so the caller can decide how to report it.
    #[must_use]
    pub fn topological_order(&self, root: &str) -> Vec<String> {
        let Some(root_idx) = self.index_of(root) else {
            return Vec::new();
        };

        if self.graph.edges_directed(root_idx, Direction::Outgoing).next().is_none() {
            return vec![self.graph[root_idx].name.clone()];
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.post_order(root_idx, &mut visited, &mut order);
        order.into_iter().map(|idx| self.graph[idx].name.clone()).collect()
    }

    fn post_order(&self, node: NodeIndex, visited: &mut HashSet<NodeIndex>, order: &mut Vec<NodeIndex>) {
        if !visited.insert(node) {
            return;
        }
        for child in self.ordered_children(node) {
            self.post_order(child, visited, order);
        }
        order.push(node);
    }

    /// Union of the orders of several roots.
    ///
    /// Names keep the position of their first appearance; later duplicates
    /// are dropped.
    #[must_use]
    pub fn topological_order_all<S: AsRef<str>>(&self, roots: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for root in roots {
            for name in self.topological_order(root.as_ref()) {
                if seen.insert(normalize_name(&name)) {
                    result.push(name);
                }
            }
        }
        result
    }

    /// Direct dependencies of `name` in declared order.
    #[must_use]
    pub fn children(&self, name: &str) -> Vec<String> {
        self.index_of(name).map_or_else(Vec::new, |idx| {
            self.ordered_children(idx).into_iter().map(|c| self.graph[c].name.clone()).collect()
        })
    }

    /// Bundles that depend directly on `name`, in declaration order.
    #[must_use]
    pub fn parents(&self, name: &str) -> Vec<String> {
        self.index_of(name).map_or_else(Vec::new, |idx| {
            self.ordered_parents(idx).into_iter().map(|p| self.graph[p].name.clone()).collect()
        })
    }

    /// All bundles `name` depends on, directly or indirectly, breadth-first.
    #[must_use]
    pub fn transitive_dependencies(&self, name: &str) -> Vec<String> {
        let mut deps = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(idx) = self.index_of(name) {
            seen.insert(idx);
            queue.push_back(idx);

            while let Some(current) = queue.pop_front() {
                for neighbor in self.ordered_children(current) {
                    if seen.insert(neighbor) {
                        deps.push(self.graph[neighbor].name.clone());
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        deps
    }

    /// Look up a bundle by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BundleUnit> {
        self.index_of(name).map(|idx| &self.graph[idx])
    }

    /// Look up a bundle by name for modification.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut BundleUnit> {
        let idx = self.index_of(name)?;
        Some(&mut self.graph[idx])
    }

    /// Whether a vertex exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// All bundles in insertion order.
    pub fn bundles(&self) -> impl Iterator<Item = &BundleUnit> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Find an existing asset with the same identity anywhere in the graph.
    ///
    /// Scans bundles in insertion order and assets in declared order.
    pub fn find_asset_mut(&mut self, asset: &AssetUnit) -> Option<&mut Arc<AssetUnit>> {
        self.graph
            .node_weights_mut()
            .flat_map(|bundle| bundle.assets.iter_mut())
            .find(|existing| existing.matches(asset))
    }

    /// Number of bundles, placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no bundles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of dependency edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Render the dependencies of `root` as an ASCII tree.
    ///
    /// Returns `None` for an unknown root. A bundle reachable through several
    /// paths is expanded once and marked `(shown above)` afterwards.
    #[must_use]
    pub fn to_tree_string(&self, root: &str) -> Option<String> {
        let idx = self.index_of(root)?;
        let mut result = format!("{}\n", self.graph[idx].name);
        let mut visited = HashSet::from([idx]);
        let children = self.ordered_children(idx);
        for (i, child) in children.iter().enumerate() {
            self.build_tree_string(*child, &mut result, "", i == children.len() - 1, &mut visited);
        }
        Some(result)
    }

    fn build_tree_string(
        &self,
        node: NodeIndex,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        let bundle = &self.graph[node];
        let marker = if bundle.is_defined() {
            ""
        } else {
            " (undefined)"
        };

        if !visited.insert(node) {
            result.push_str(&format!("{prefix}{connector}{}{marker} (shown above)\n", bundle.name));
            return;
        }
        result.push_str(&format!("{prefix}{connector}{}{marker}\n", bundle.name));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let children = self.ordered_children(node);
        for (i, child) in children.iter().enumerate() {
            self.build_tree_string(*child, result, &child_prefix, i == children.len() - 1, visited);
        }
    }
}

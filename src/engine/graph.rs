//! The dependency graph deciding which artifacts must be rebuilt.
//!
//! Every artifact taking part in a build owns a node in [`DepGraph`]. A node
//! carries three flags:
//!
//! * **dirty**: the artifact must be rendered and written during this build.
//! * **used**: the artifact was consulted as an input, dirty or not.
//! * **marked dirty**: a one-shot latch set by [`DepGraph::mark_dirty`],
//!   which is what keeps propagation finite on cyclic graphs.
//!
//! ## Propagation
//!
//! Marking a node dirty dirties the node itself and its *immediate*
//! dependents, nothing further. Artifacts wanting to hear about changes of a
//! whole set of inputs hold a [bundle](DepGraph::bundle) instead: a bundle
//! re-enters `mark_dirty` as soon as one of its members dirties it, which
//! forwards the change one more hop to whoever depends on the bundle.
//!
//! Edges whose outcome is already settled are never stored. If the dependent
//! is dirty, the dependency is only flagged as used; if the dependency was
//! already marked dirty, the dependent is dirtied on the spot.
//!
//! The graph is an arena: nodes are referred to by [`NodeId`] and edges are
//! plain indices in both directions, so cycles own nothing. The whole graph
//! is dropped and rebuilt on every build.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};

/// Stable handle to a node in [`DepGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NodeIndex);

impl NodeId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// The closed set of things that can live in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Post,
    Page,
    StaticFile,
    /// A composite node with no identity of its own, see [`DepGraph::bundle`].
    Bundle,
}

#[derive(Debug, Clone)]
struct Tracked {
    kind: NodeKind,
    label: String,
    dirty: bool,
    marked_dirty: bool,
    used: bool,
    /// What a bundle was created over, edge or not.
    members: Vec<NodeId>,
}

/// Arena of trackable nodes. Edges point from a dependency to its dependent.
#[derive(Debug, Default)]
pub struct DepGraph {
    graph: Graph<Tracked, ()>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fresh node, clean and unused.
    pub fn add_node(&mut self, kind: NodeKind, label: impl Into<String>) -> NodeId {
        NodeId(self.graph.add_node(Tracked {
            kind,
            label: label.into(),
            dirty: false,
            marked_dirty: false,
            used: false,
            members: Vec::new(),
        }))
    }

    /// Creates a bundle over `members`, registering each of them through
    /// [`add_dependency`](Self::add_dependency).
    ///
    /// A bundle is a transparent proxy: marking it used marks every member
    /// used, and a member turning dirty dirties the bundle *and* the nodes
    /// depending on the bundle.
    pub fn bundle(
        &mut self,
        label: impl Into<String>,
        members: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        let bundle = self.add_node(NodeKind::Bundle, label);
        let members: Vec<_> = members.into_iter().collect();
        self.graph[bundle.0].members = members.clone();

        for member in members {
            self.add_dependency(bundle, member);
        }

        bundle
    }

    /// Records that `node` reads `other`. Does nothing when `other` is `None`.
    pub fn add_dependency(&mut self, node: NodeId, other: impl Into<Option<NodeId>>) {
        let Some(other) = other.into() else {
            return;
        };

        if self.graph[node.0].dirty {
            self.mark_used(other);
        } else if self.graph[other.0].marked_dirty {
            self.dependent_dirty(node);
        } else if self.graph.find_edge(other.0, node.0).is_none() {
            self.graph.add_edge(other.0, node.0, ());
        }
    }

    /// Flags `node` as consulted. Bundles forward this to all of their
    /// members, transitively through nested bundles.
    pub fn mark_used(&mut self, node: NodeId) {
        let mut stack = vec![node];
        let mut seen = HashSet::new();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }

            let tracked = &mut self.graph[id.0];
            tracked.used = true;

            if tracked.kind == NodeKind::Bundle {
                stack.extend_from_slice(&tracked.members);
                stack.extend(self.dependencies(id));
            }
        }
    }

    /// Dirties `node` and its immediate dependents. Later calls on the same
    /// node return immediately.
    pub fn mark_dirty(&mut self, node: NodeId) {
        let tracked = &mut self.graph[node.0];
        if tracked.marked_dirty {
            return;
        }
        tracked.marked_dirty = true;

        self.dependent_dirty(node);

        for dependent in self.dependents(node) {
            self.dependent_dirty(dependent);
        }
    }

    /// Called when `node` has to be rebuilt because something it reads
    /// changed. The inputs of a dirty node all count as used.
    pub(crate) fn dependent_dirty(&mut self, node: NodeId) {
        self.graph[node.0].dirty = true;
        self.mark_used(node);

        for dependency in self.dependencies(node) {
            self.mark_used(dependency);
        }

        if self.graph[node.0].kind == NodeKind::Bundle {
            self.mark_dirty(node);
        }
    }

    pub fn is_dirty(&self, node: NodeId) -> bool {
        self.graph[node.0].dirty
    }

    pub fn is_used(&self, node: NodeId) -> bool {
        self.graph[node.0].used
    }

    pub fn is_marked_dirty(&self, node: NodeId) -> bool {
        self.graph[node.0].marked_dirty
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.graph[node.0].kind
    }

    pub fn label(&self, node: NodeId) -> &str {
        &self.graph[node.0].label
    }

    /// The nodes a bundle was created over. Empty for anything else.
    pub fn members(&self, node: NodeId) -> &[NodeId] {
        &self.graph[node.0].members
    }

    /// Nodes `node` reads, in the order the edges were added.
    pub fn dependencies(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Nodes reading `node`, in the order the edges were added.
    pub fn dependents(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbors(node, Direction::Outgoing)
    }

    fn neighbors(&self, node: NodeId, direction: Direction) -> Vec<NodeId> {
        // petgraph walks the adjacency list newest first
        let mut neighbors: Vec<_> = self
            .graph
            .neighbors_directed(node.0, direction)
            .map(NodeId)
            .collect();
        neighbors.reverse();
        neighbors
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of non-bundle nodes currently dirty.
    pub fn count_dirty(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|node| node.dirty && node.kind != NodeKind::Bundle)
            .count()
    }
}

/// Renders the graph as a Mermaid diagram. Dirty nodes are red, nodes that
/// were only used are yellow.
impl Display for DepGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let node = &self.graph[index];
            let name = node.label.replace('"', "\\\"");

            match node.kind {
                NodeKind::Bundle => writeln!(f, "    {}{{{{\"{}\"}}}}", index.index(), name)?,
                _ => writeln!(f, "    {}[\"{}\"]", index.index(), name)?,
            }

            if node.dirty {
                writeln!(f, "    style {} fill:#FF6B6B", index.index())?;
            } else if node.used {
                writeln!(f, "    style {} fill:#FFE66D", index.index())?;
            }
        }

        for edge in self.graph.raw_edges() {
            writeln!(
                f,
                "    {} --> {}",
                edge.source().index(),
                edge.target().index()
            )?;
        }

        Ok(())
    }
}

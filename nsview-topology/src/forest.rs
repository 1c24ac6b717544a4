//! Per-kind namespace forest
//!
//! Nodes live in an arena and are linked child/sibling style: every node
//! knows its first child and its next sibling, so a node may have any number
//! of children while staying a fixed-size record. Children keep insertion
//! order. The first namespace inserted becomes the root; namespaces without
//! a resolvable parent are hung directly under it.
//!
//! All traversals are pre-order (node, then its child subtree, then its
//! sibling chain) and run on an explicit stack, so forest depth is bounded
//! only by memory.

use serde::Serialize;

use nsview_core::{Error, NamespaceId, NamespaceKind, Result};

use crate::namespace::{Namespace, NamespaceDirectory};

/// Handle of a node in a [`NamespaceForest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in insertion order
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    nid: NamespaceId,
    depth: u32,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/// Forest of the namespaces of one kind
#[derive(Debug, Clone)]
pub struct NamespaceForest {
    kind: NamespaceKind,
    nodes: Vec<Node>,
}

impl NamespaceForest {
    /// Create an empty forest
    #[must_use]
    pub const fn new(kind: NamespaceKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }

    /// Kind of the namespaces in this forest
    #[must_use]
    pub const fn kind(&self) -> NamespaceKind {
        self.kind
    }

    /// The first inserted node
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if nothing was inserted yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Namespace id held by a node
    #[must_use]
    pub fn namespace(&self, node: NodeId) -> NamespaceId {
        self.nodes[node.0].nid
    }

    /// Depth of a node, the root being 0
    #[must_use]
    pub fn depth(&self, node: NodeId) -> u32 {
        self.nodes[node.0].depth
    }

    /// First child of a node
    #[must_use]
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].first_child
    }

    /// Next sibling of a node
    #[must_use]
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].next_sibling
    }

    /// Direct children of a node in insertion order
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first_child(node), |&child| self.next_sibling(child))
    }

    /// Find the node holding `nid`, searching in pre-order from the root
    #[must_use]
    pub fn find(&self, nid: NamespaceId) -> Option<NodeId> {
        self.preorder().find(|&node| self.nodes[node.0].nid == nid)
    }

    /// Insert a namespace, returning its node
    ///
    /// The parent node is the root for orphaned namespaces, otherwise the
    /// node holding the namespace's parent id, falling back to the root when
    /// that id is not in the forest. The new node becomes the last child of
    /// its parent.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for a namespace of another kind and
    /// [`Error::ResourceExhausted`] if the arena cannot grow
    pub fn insert(&mut self, namespace: &Namespace) -> Result<NodeId> {
        if namespace.kind() != self.kind {
            return Err(Error::InvalidArgument {
                message: format!(
                    "cannot insert {} namespace into {} forest",
                    namespace.kind(),
                    self.kind
                ),
            });
        }

        self.nodes.try_reserve(1)?;
        let id = NodeId(self.nodes.len());

        let Some(root) = self.root() else {
            self.nodes.push(Node::leaf(namespace.nid(), 0));
            return Ok(id);
        };

        let parent = if namespace.is_orphaned() {
            root
        } else {
            self.find(namespace.pnid()).unwrap_or(root)
        };

        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(Node::leaf(namespace.nid(), depth));

        match self.nodes[parent.0].last_child {
            Some(last) => self.nodes[last.0].next_sibling = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        self.nodes[parent.0].last_child = Some(id);

        Ok(id)
    }

    /// Count the nodes reachable from `node`: itself, its children and its
    /// siblings, recursively
    #[must_use]
    pub fn depth_count(&self, node: NodeId) -> usize {
        self.preorder_from(node).count()
    }

    /// Pre-order walk of the whole forest
    #[must_use]
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            forest: self,
            stack: self.root().into_iter().collect(),
            boundary: None,
        }
    }

    /// Pre-order walk starting at `node` and following its sibling chain
    #[must_use]
    pub fn preorder_from(&self, node: NodeId) -> Preorder<'_> {
        Preorder {
            forest: self,
            stack: vec![node],
            boundary: None,
        }
    }

    /// Pre-order walk of `node` and its descendants only
    #[must_use]
    pub fn subtree(&self, node: NodeId) -> Preorder<'_> {
        Preorder {
            forest: self,
            stack: vec![node],
            boundary: Some(node),
        }
    }

    /// Split a walk into its parented and orphaned nodes
    ///
    /// Orphan status is read from the namespace records at call time.
    /// Both sequences keep walk order, and together hold every walked node
    /// exactly once. Parented nodes below an orphan record that orphan in
    /// [`ReportEntry::orphan_branch`].
    #[must_use]
    pub fn report(&self, walk: Preorder<'_>, directory: &NamespaceDirectory) -> ForestReport {
        let mut report = ForestReport {
            kind: self.kind,
            base_depth: walk.stack.last().map_or(0, |&start| self.depth(start)),
            parented: Vec::new(),
            orphaned: Vec::new(),
        };

        // (depth, index in `orphaned`) of the orphans enclosing the walk position
        let mut enclosing: Vec<(u32, usize)> = Vec::new();
        for node in walk {
            let mut entry = self.entry(node, directory);
            while enclosing
                .last()
                .is_some_and(|&(depth, _)| depth >= entry.depth)
            {
                enclosing.pop();
            }

            if entry.orphaned {
                enclosing.push((entry.depth, report.orphaned.len()));
            } else {
                entry.orphan_branch = enclosing.last().map(|&(_, index)| index);
            }
            report.push(entry);
        }

        report
    }

    /// Report holding a single node, at its own depth
    #[must_use]
    pub fn report_node(&self, node: NodeId, directory: &NamespaceDirectory) -> ForestReport {
        let mut report = ForestReport::empty(self.kind);
        report.base_depth = self.depth(node);
        report.push(self.entry(node, directory));
        report
    }

    fn entry(&self, node: NodeId, directory: &NamespaceDirectory) -> ReportEntry {
        let nid = self.namespace(node);
        ReportEntry {
            node,
            nid,
            depth: self.depth(node),
            orphaned: directory
                .get(self.kind, nid)
                .is_some_and(Namespace::is_orphaned),
            orphan_branch: None,
        }
    }
}

impl Node {
    const fn leaf(nid: NamespaceId, depth: u32) -> Self {
        Self {
            nid,
            depth,
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }
}

/// Lazy pre-order walk over a [`NamespaceForest`]
///
/// Cloning a walk restarts nothing; it forks the remaining sequence.
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    forest: &'a NamespaceForest,
    stack: Vec<NodeId>,
    boundary: Option<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        let record = &self.forest.nodes[node.0];

        // siblings go under children so the child subtree is visited first
        if self.boundary != Some(node) {
            if let Some(sibling) = record.next_sibling {
                self.stack.push(sibling);
            }
        }
        if let Some(child) = record.first_child {
            self.stack.push(child);
        }

        Some(node)
    }
}

/// One node of a [`ForestReport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// Node in the forest
    #[serde(skip)]
    pub node: NodeId,
    /// Namespace id
    pub nid: NamespaceId,
    /// Absolute depth in the forest
    pub depth: u32,
    /// Orphan classification
    pub orphaned: bool,
    /// Index in [`ForestReport::orphaned`] of the nearest orphan above a
    /// parented entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphan_branch: Option<usize>,
}

/// Parented/orphaned split of a forest walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForestReport {
    /// Kind of the walked forest
    pub kind: NamespaceKind,
    /// Depth of the node the walk started at
    pub base_depth: u32,
    /// Nodes not classified orphaned, in pre-order
    pub parented: Vec<ReportEntry>,
    /// Nodes classified orphaned, in pre-order
    pub orphaned: Vec<ReportEntry>,
}

impl ForestReport {
    /// An empty report
    #[must_use]
    pub const fn empty(kind: NamespaceKind) -> Self {
        Self {
            kind,
            base_depth: 0,
            parented: Vec::new(),
            orphaned: Vec::new(),
        }
    }

    fn push(&mut self, entry: ReportEntry) {
        if entry.orphaned {
            self.orphaned.push(entry);
        } else {
            self.parented.push(entry);
        }
    }

    /// Number of reported nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.parented.len() + self.orphaned.len()
    }

    /// Check if no node was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parented.is_empty() && self.orphaned.is_empty()
    }

    /// Parented entries that do not sit below an orphan
    pub fn attached(&self) -> impl Iterator<Item = &ReportEntry> {
        self.parented
            .iter()
            .filter(|entry| entry.orphan_branch.is_none())
    }

    /// Every orphan with the parented entries of its subtree, in walk order
    #[must_use]
    pub fn branches(&self) -> Vec<(&ReportEntry, Vec<&ReportEntry>)> {
        let mut branches: Vec<(&ReportEntry, Vec<&ReportEntry>)> = self
            .orphaned
            .iter()
            .map(|orphan| (orphan, Vec::new()))
            .collect();

        for entry in &self.parented {
            let Some(index) = entry.orphan_branch else {
                continue;
            };
            if let Some((_, subtree)) = branches.get_mut(index) {
                subtree.push(entry);
            }
        }
        branches
    }

    /// Entries in presentation order: the attached entries, then each
    /// orphan followed by its subtree
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.attached().chain(
            self.branches()
                .into_iter()
                .flat_map(|(orphan, subtree)| std::iter::once(orphan).chain(subtree)),
        )
    }

    /// Depth of an entry relative to where the walk started
    #[must_use]
    pub const fn relative_depth(&self, entry: &ReportEntry) -> u32 {
        entry.depth.saturating_sub(self.base_depth)
    }
}

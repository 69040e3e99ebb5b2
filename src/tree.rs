//! The analysis result tree and the traversal shared by search, export and extraction.

use crate::model::{ContainerLocation, EventInfo, SubSoundDescriptor};
use std::path::PathBuf;

/// Outcome of analyzing a file or container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    /// Analysis finished; the node's children are complete.
    Done,
    /// Analysis failed; the node has no (or only partial) children.
    Failed(String),
    /// A stop was requested before every container was probed; the children are partial.
    Stopped,
}

impl NodeStatus {
    /// Returns `true` for [`NodeStatus::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One analyzed input file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileRoot {
    /// Display name, the file name of `path`.
    pub name: String,
    /// The analyzed file.
    pub path: PathBuf,
    /// Whether analysis of the file succeeded.
    pub status: NodeStatus,
    /// Whether the node is checked for extraction.
    pub selected: bool,
    /// Event groups, containers or (for flattened banks) sub-sounds.
    pub children: Vec<AnalysisNode>,
}

/// A sound container embedded in a bank, or a standalone `.fsb` file's container.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerGroup {
    /// Resolved `.fsb` name, unique within the parent.
    pub name: String,
    /// Where the container starts.
    pub location: ContainerLocation,
    /// Whether the container could be probed.
    pub status: NodeStatus,
    /// Whether the node is checked for extraction.
    pub selected: bool,
    /// The container's sub-sounds.
    pub children: Vec<AnalysisNode>,
}

/// Logical events reported by the engine for a bank.
#[derive(Clone, Debug, PartialEq)]
pub struct EventGroup {
    /// Display name.
    pub name: String,
    /// Whether the node is checked for extraction.
    pub selected: bool,
    /// [`AnalysisNode::Event`] nodes.
    pub children: Vec<AnalysisNode>,
}

/// One logical event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventNode {
    /// What the engine reported about the event.
    pub info: EventInfo,
    /// Whether the node is checked for extraction.
    pub selected: bool,
}

/// One sub-sound, the unit of extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct SubSoundLeaf {
    /// Display name, unique within the parent; also the output file stem.
    pub name: String,
    /// Properties captured during analysis.
    pub descriptor: SubSoundDescriptor,
    /// Whether the node is checked for extraction.
    pub selected: bool,
}

/// A node in the analysis result tree.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisNode {
    /// See [`FileRoot`].
    FileRoot(FileRoot),
    /// See [`ContainerGroup`].
    ContainerGroup(ContainerGroup),
    /// See [`EventGroup`].
    EventGroup(EventGroup),
    /// See [`EventNode`].
    Event(EventNode),
    /// See [`SubSoundLeaf`].
    SubSoundLeaf(SubSoundLeaf),
}

impl AnalysisNode {
    /// Returns the node's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::FileRoot(n) => &n.name,
            Self::ContainerGroup(n) => &n.name,
            Self::EventGroup(n) => &n.name,
            Self::Event(n) => &n.info.path,
            Self::SubSoundLeaf(n) => &n.name,
        }
    }

    /// Returns a short label for the kind of node.
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::FileRoot(_) => "File",
            Self::ContainerGroup(_) => "Container",
            Self::EventGroup(_) => "EventGroup",
            Self::Event(_) => "Event",
            Self::SubSoundLeaf(_) => "SubSound",
        }
    }

    /// Returns the node's children in display order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::FileRoot(n) => &n.children,
            Self::ContainerGroup(n) => &n.children,
            Self::EventGroup(n) => &n.children,
            Self::Event(_) | Self::SubSoundLeaf(_) => &[],
        }
    }

    fn children_mut(&mut self) -> &mut [Self] {
        match self {
            Self::FileRoot(n) => &mut n.children,
            Self::ContainerGroup(n) => &mut n.children,
            Self::EventGroup(n) => &mut n.children,
            Self::Event(_) | Self::SubSoundLeaf(_) => &mut [],
        }
    }

    /// Returns the analysis status of file and container nodes.
    #[must_use]
    pub fn status(&self) -> Option<&NodeStatus> {
        match self {
            Self::FileRoot(n) => Some(&n.status),
            Self::ContainerGroup(n) => Some(&n.status),
            _ => None,
        }
    }

    /// Returns the leaf, if this is one.
    #[must_use]
    pub fn as_leaf(&self) -> Option<&SubSoundLeaf> {
        match self {
            Self::SubSoundLeaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Returns `true` if the node itself is checked.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        match self {
            Self::FileRoot(n) => n.selected,
            Self::ContainerGroup(n) => n.selected,
            Self::EventGroup(n) => n.selected,
            Self::Event(n) => n.selected,
            Self::SubSoundLeaf(n) => n.selected,
        }
    }

    /// Checks or unchecks this node only.
    pub fn set_selected(&mut self, selected: bool) {
        match self {
            Self::FileRoot(n) => n.selected = selected,
            Self::ContainerGroup(n) => n.selected = selected,
            Self::EventGroup(n) => n.selected = selected,
            Self::Event(n) => n.selected = selected,
            Self::SubSoundLeaf(n) => n.selected = selected,
        }
    }

    /// Checks or unchecks this node and everything below it.
    pub fn set_selected_recursive(&mut self, selected: bool) {
        self.set_selected(selected);
        for child in self.children_mut() {
            child.set_selected_recursive(selected);
        }
    }

    /// Counts the sub-sound leaves below (or at) this node.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        walk_matching(std::slice::from_ref(self), |node| node.as_leaf().is_some()).count()
    }
}

/// A node reached by a traversal, together with the path leading to it.
#[derive(Clone, Debug)]
pub struct Visit<'a> {
    /// The visited node.
    pub node: &'a AnalysisNode,
    /// The node's ancestors, outermost first.
    pub ancestors: Vec<&'a AnalysisNode>,
}

impl Visit<'_> {
    /// Joins the names of the ancestors and the node with `/`.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.ancestors
            .iter()
            .chain([&self.node])
            .map(|node| node.name())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Returns the file the node was analyzed from.
    #[must_use]
    pub fn source(&self) -> Option<&PathBuf> {
        self.ancestors
            .iter()
            .chain([&self.node])
            .find_map(|node| match node {
                AnalysisNode::FileRoot(root) => Some(&root.path),
                _ => None,
            })
    }
}

/// Lazy pre-order traversal over a forest of nodes.
///
/// Only nodes accepted by the predicate are yielded, but every node is descended into.
pub struct Walk<'a, P> {
    stack: Vec<(&'a AnalysisNode, usize)>,
    path: Vec<&'a AnalysisNode>,
    predicate: P,
}

impl<'a, P: FnMut(&AnalysisNode) -> bool> Iterator for Walk<'a, P> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, depth)) = self.stack.pop() {
            self.path.truncate(depth);
            self.stack
                .extend(node.children().iter().rev().map(|child| (child, depth + 1)));

            let visit = (self.predicate)(node).then(|| Visit {
                node,
                ancestors: self.path.clone(),
            });
            self.path.push(node);

            if visit.is_some() {
                return visit;
            }
        }

        None
    }
}

impl<P> std::fmt::Debug for Walk<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walk")
            .field("pending", &self.stack.len())
            .field("depth", &self.path.len())
            .finish_non_exhaustive()
    }
}

/// Visits every node of `roots` in document order.
pub fn walk(roots: &[AnalysisNode]) -> Walk<'_, fn(&AnalysisNode) -> bool> {
    let every: fn(&AnalysisNode) -> bool = |_| true;
    walk_matching(roots, every)
}

/// Visits the nodes of `roots` accepted by `predicate`, in document order.
pub fn walk_matching<P: FnMut(&AnalysisNode) -> bool>(
    roots: &[AnalysisNode],
    predicate: P,
) -> Walk<'_, P> {
    Walk {
        stack: roots.iter().rev().map(|root| (root, 0)).collect(),
        path: Vec::new(),
        predicate,
    }
}

/// Visits the checked sub-sound leaves.
///
/// Only a leaf's own flag counts; use [`AnalysisNode::set_selected_recursive`] to check or
/// uncheck a whole file or container.
pub fn selected_leaves(roots: &[AnalysisNode]) -> impl Iterator<Item = Visit<'_>> {
    walk_matching(roots, |node| node.as_leaf().is_some_and(|leaf| leaf.selected))
}

/// Visits the nodes whose names contain `text`, ignoring case.
pub fn search<'a>(roots: &'a [AnalysisNode], text: &str) -> impl Iterator<Item = Visit<'a>> {
    let needle = text.to_lowercase();
    walk_matching(roots, move |node| node.name().to_lowercase().contains(&needle))
}

#![forbid(unsafe_code)]

//! Document subsets for canonicalization.
//!
//! A `NodeSet` names the nodes of one parsed document that a canonicalizer
//! should render. Namespace and attribute nodes are not tracked separately:
//! an element in the set renders with its full attribute axis.

use roxmltree::{Document, Node, NodeId, NodeType};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Every node in the document, comments included.
    pub fn all(doc: &Document<'_>) -> Self {
        Self::tree(doc.root())
    }

    /// Every node except comments. This is what `URI=""` selects.
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::tree_without_comments(doc.root())
    }

    /// `root` and all of its descendants.
    pub fn tree(root: Node<'_, '_>) -> Self {
        Self {
            nodes: root.descendants().map(|n| n.id()).collect(),
        }
    }

    /// `root` and its descendants, minus comment nodes. This is what a
    /// bare-name `#id` reference selects.
    pub fn tree_without_comments(root: Node<'_, '_>) -> Self {
        Self {
            nodes: root
                .descendants()
                .filter(|n| n.node_type() != NodeType::Comment)
                .map(|n| n.id())
                .collect(),
        }
    }

    /// Remove `root` and everything below it.
    pub fn subtract_tree(&mut self, root: Node<'_, '_>) {
        for node in root.descendants() {
            self.nodes.remove(&node.id());
        }
    }

    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

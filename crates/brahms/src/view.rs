//! Views: sets of nodes keyed by identity.
//!
//! Storage is ordered by [`Nid`], so iteration is always in canonical order.
//! That makes [`View::pick`] reproducible for a given random source, which the
//! round algorithm and its tests rely on.

use crate::node::{Nid, Node};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt::{self, Display, Formatter};

/// A set of nodes keyed by their identity.
///
/// Never contains the zero node: inserting one is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    nodes: BTreeMap<Nid, Node>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a view from a list of nodes. Duplicates collapse.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        nodes.into_iter().copied().collect()
    }

    /// Insert a node, returns true if its identity was not present yet.
    pub fn insert(&mut self, node: Node) -> bool {
        if node.is_zero() {
            return false;
        }

        self.nodes.insert(node.id(), node).is_none()
    }

    pub fn remove(&mut self, id: &Nid) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// A copy of the node stored for `id`.
    pub fn get(&self, id: &Nid) -> Option<Node> {
        self.nodes.get(id).copied()
    }

    pub fn contains(&self, id: &Nid) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identities in canonical order.
    pub fn ids(&self) -> impl Iterator<Item = &Nid> {
        self.nodes.keys()
    }

    /// Nodes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All nodes, sorted by identity.
    pub fn sorted(&self) -> Vec<Node> {
        self.nodes.values().copied().collect()
    }

    /// Pick at most `n` members uniformly at random without replacement.
    ///
    /// Members are shuffled in canonical order, so the same random source
    /// state over the same contents always yields the same pick.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> View {
        let mut nodes = self.sorted();
        nodes.shuffle(rng);
        nodes.into_iter().take(n).collect()
    }

    /// Union `others` into this view and return it. On duplicate identities
    /// the last applied node wins.
    pub fn concat<'a>(mut self, others: impl IntoIterator<Item = &'a View>) -> View {
        for other in others {
            self.nodes
                .extend(other.nodes.iter().map(|(id, node)| (*id, *node)));
        }
        self
    }

    /// Members of this view that are not in `other`.
    pub fn diff(&self, other: &View) -> View {
        self.nodes
            .iter()
            .filter(|(id, _)| !other.contains(id))
            .map(|(_, node)| *node)
            .collect()
    }

    /// Members present in both views.
    pub fn inter(&self, other: &View) -> View {
        self.nodes
            .iter()
            .filter(|(id, _)| other.contains(id))
            .map(|(_, node)| *node)
            .collect()
    }
}

impl Display for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.nodes.values().map(Node::to_string).collect();
        write!(f, "{{{}}}", fields.join(", "))
    }
}

impl FromIterator<Node> for View {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut view = View::new();
        view.extend(iter);
        view
    }
}

impl Extend<Node> for View {
    fn extend<I: IntoIterator<Item = Node>>(&mut self, iter: I) {
        for node in iter {
            self.insert(node);
        }
    }
}

impl IntoIterator for View {
    type Item = Node;
    type IntoIter = btree_map::IntoValues<Nid, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_values()
    }
}

impl<'a> IntoIterator for &'a View {
    type Item = &'a Node;
    type IntoIter = btree_map::Values<'a, Nid, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.values()
    }
}

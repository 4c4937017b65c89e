//! Equation numbering for circuit nodes and branch unknowns.
//!
//! Nodes and branch currents share one numbering space. Ground is id 0 and
//! never appears in the matrix; every other id `n` maps to matrix row `n - 1`.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Unique identifier for one unknown of the circuit equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The ground node (node 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Create a new NodeId from a raw value.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this is the ground node.
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }

    /// Matrix row/column of this unknown, `None` for ground.
    pub fn index(self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some((self.0 - 1) as usize)
        }
    }

    /// Inverse of [`NodeId::index`].
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32 + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// What an equation unknown represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationKind {
    /// A node voltage.
    Node,
    /// A branch current (voltage sources, inductors).
    Branch,
    /// A device-internal node (series resistance, gate network, thermal node).
    Internal,
}

/// Name-indexed table of equation unknowns.
#[derive(Debug, Clone, Default)]
pub struct EquationTable {
    entries: IndexMap<String, EquationKind>,
}

impl EquationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node with the given name.
    ///
    /// `"0"` and `"gnd"` (any case) always resolve to ground. An existing
    /// unknown of any kind is returned as is.
    pub fn node(&mut self, name: &str) -> NodeId {
        if is_ground_name(name) {
            return NodeId::GROUND;
        }
        let entry = self.entries.entry(name.to_string());
        let index = entry.index();
        entry.or_insert(EquationKind::Node);
        NodeId::from_index(index)
    }

    /// Create a branch-current unknown. Branch names must be unique.
    pub fn branch(&mut self, name: &str) -> Result<NodeId> {
        self.insert_unique(name, EquationKind::Branch)
    }

    /// Create a device-internal node. Internal names must be unique.
    pub fn internal(&mut self, name: &str) -> Result<NodeId> {
        self.insert_unique(name, EquationKind::Internal)
    }

    fn insert_unique(&mut self, name: &str, kind: EquationKind) -> Result<NodeId> {
        if is_ground_name(name) || self.entries.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let (index, _) = self.entries.insert_full(name.to_string(), kind);
        Ok(NodeId::from_index(index))
    }

    /// Look up an existing unknown by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        if is_ground_name(name) {
            return Some(NodeId::GROUND);
        }
        self.entries.get_index_of(name).map(NodeId::from_index)
    }

    /// Look up a node voltage unknown, rejecting branch and internal unknowns.
    pub fn find_node(&self, name: &str) -> Result<NodeId> {
        match self.find(name) {
            Some(id) if id.is_ground() || self.kind(id) == Some(EquationKind::Node) => Ok(id),
            _ => Err(Error::NodeNotFound(name.to_string())),
        }
    }

    /// Name of an unknown.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match id.index() {
            None => Some("0"),
            Some(i) => self.entries.get_index(i).map(|(name, _)| name.as_str()),
        }
    }

    /// Kind of an unknown, `None` for ground or unknown ids.
    pub fn kind(&self, id: NodeId) -> Option<EquationKind> {
        id.index()
            .and_then(|i| self.entries.get_index(i))
            .map(|(_, kind)| *kind)
    }

    /// Number of non-ground unknowns (the matrix dimension).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no unknowns exist.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_ground_name(name: &str) -> bool {
    name == "0" || name.eq_ignore_ascii_case("gnd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_node() {
        assert!(NodeId::GROUND.is_ground());
        assert_eq!(NodeId::GROUND.index(), None);
        assert_eq!(NodeId::GROUND.to_string(), "GND");
    }

    #[test]
    fn test_index_round_trip() {
        let id = NodeId::new(7);
        assert_eq!(id.index(), Some(6));
        assert_eq!(NodeId::from_index(6), id);
    }

    #[test]
    fn test_node_reuse_and_ground_aliases() {
        let mut table = EquationTable::new();
        let a = table.node("in");
        let b = table.node("in");
        assert_eq!(a, b);
        assert_eq!(table.node("0"), NodeId::GROUND);
        assert_eq!(table.node("GND"), NodeId::GROUND);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_branch_names_are_unique() {
        let mut table = EquationTable::new();
        table.branch("V1#branch").unwrap();
        assert!(matches!(
            table.branch("V1#branch"),
            Err(Error::DuplicateName(_))
        ));
    }

    #[test]
    fn test_find_node_rejects_branches() {
        let mut table = EquationTable::new();
        table.node("out");
        table.branch("V1#branch").unwrap();
        assert!(table.find_node("out").is_ok());
        assert!(matches!(
            table.find_node("V1#branch"),
            Err(Error::NodeNotFound(_))
        ));
        assert!(matches!(
            table.find_node("missing"),
            Err(Error::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_node_keeps_existing_branch_kind() {
        let mut table = EquationTable::new();
        let br = table.branch("V1#branch").unwrap();
        assert_eq!(table.node("V1#branch"), br);
        assert_eq!(table.kind(br), Some(EquationKind::Branch));
        assert_eq!(table.len(), 1);
        assert!(matches!(
            table.find_node("V1#branch"),
            Err(Error::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_shared_numbering() {
        let mut table = EquationTable::new();
        let n1 = table.node("a");
        let br = table.branch("L1#branch").unwrap();
        let n2 = table.node("b");
        assert_eq!(n1.index(), Some(0));
        assert_eq!(br.index(), Some(1));
        assert_eq!(n2.index(), Some(2));
        assert_eq!(table.kind(br), Some(EquationKind::Branch));
        assert_eq!(table.name(n2), Some("b"));
    }
}

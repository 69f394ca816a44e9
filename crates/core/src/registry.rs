//! Locally known nodes, merged from device manager notifications.

use indexmap::IndexMap;
use tdm_protocol::NodeId;

use crate::node::{Node, NodeInfo};

/// Nodes keyed by identity, in order of first appearance.
///
/// Entries are only created or replaced by [`merge`](Self::merge); nothing is
/// removed (a vanished node is reported with a `Disconnected` status).
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
	nodes: IndexMap<NodeId, Node>,
}

impl NodeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Merges one notification: a known identity is replaced wholesale at its
	/// current position, an unknown one is appended.
	pub fn merge(&mut self, update: impl IntoIterator<Item = Node>) {
		for node in update {
			self.nodes.insert(node.id().clone(), node);
		}
	}

	pub fn get(&self, id: &NodeId) -> Option<&Node> {
		self.nodes.get(id)
	}

	pub fn contains(&self, id: &NodeId) -> bool {
		self.nodes.contains_key(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Node> {
		self.nodes.values()
	}

	/// Owned copy of the entries, for scans that await between nodes.
	pub fn snapshot(&self) -> Vec<Node> {
		self.nodes.values().cloned().collect()
	}

	pub fn infos(&self) -> Vec<NodeInfo> {
		self.nodes.values().map(Node::info).collect()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

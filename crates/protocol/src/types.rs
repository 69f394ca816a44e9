//! Identity and program metadata types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque identity of a node, stable across status updates.
///
/// Compared by string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
	pub fn new(id: impl AsRef<str>) -> Self {
		Self(Arc::from(id.as_ref()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NodeId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for NodeId {
	fn from(id: String) -> Self {
		Self(Arc::from(id))
	}
}

impl AsRef<str> for NodeId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// Declaration of a custom event a program may emit or handle.
///
/// Serialized with the `fixed_size` key applications already use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
	/// Event name as used in `onevent` / `emit`.
	pub name: String,
	/// Number of values carried by the event.
	pub fixed_size: usize,
}

impl EventDescription {
	pub fn new(name: impl Into<String>, fixed_size: usize) -> Self {
		Self {
			name: name.into(),
			fixed_size,
		}
	}
}

/// Language tag stored alongside a scratch pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgrammingLanguage {
	/// Aseba text language.
	#[default]
	Aseba,
	/// Blockly workspace.
	Blockly,
	/// VPL3 program.
	Vpl3,
}

impl ProgrammingLanguage {
	/// Numeric code used by the device manager schema.
	pub fn code(self) -> u8 {
		match self {
			Self::Aseba => 1,
			Self::Blockly => 2,
			Self::Vpl3 => 3,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_node_id_compares_by_value() {
		let a = NodeId::from("{0d2a-11}");
		let b = NodeId::from(String::from("{0d2a-11}"));
		assert_eq!(a, b);
		assert_eq!(a.to_string(), "{0d2a-11}");
	}

	#[test]
	fn test_node_id_serializes_as_plain_string() {
		let id = NodeId::from("{0d2a-11}");
		let json = serde_json::to_value(&id).unwrap();
		assert_eq!(json, serde_json::json!("{0d2a-11}"));
		let back: NodeId = serde_json::from_value(json).unwrap();
		assert_eq!(back, id);
	}

	#[test]
	fn test_event_description_keys() {
		let json = serde_json::to_value(EventDescription::new("ping", 2)).unwrap();
		assert_eq!(json, serde_json::json!({"name": "ping", "fixed_size": 2}));
	}
}

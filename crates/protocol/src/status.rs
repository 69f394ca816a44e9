//! Node status as reported by the device manager.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a node from the point of view of one client.
///
/// Numeric values match the device manager schema and must not change.
/// `Unknown`, `Connected`, `Available` and `Ready` are ordered by increasing
/// capability; `Busy` means another client holds the lock and `Disconnected`
/// means the node is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum NodeStatus {
	/// Status not reported yet.
	#[default]
	Unknown = 0,
	/// Connected but the VM description is unavailable.
	Connected = 1,
	/// Unlocked and ready to be locked by any client.
	Available = 2,
	/// Locked by another client.
	Busy = 3,
	/// Locked by this client; programs may be sent.
	Ready = 4,
	/// The node is gone.
	Disconnected = 5,
}

impl NodeStatus {
	/// All statuses in numeric order.
	pub const ALL: [NodeStatus; 6] = [
		Self::Unknown,
		Self::Connected,
		Self::Available,
		Self::Busy,
		Self::Ready,
		Self::Disconnected,
	];

	/// Returns `true` when the node can exchange messages with a client.
	pub fn is_communicable(self) -> bool {
		matches!(self, Self::Connected | Self::Available | Self::Ready)
	}

	/// Returns `true` for the statuses a selected node may stay in.
	pub fn is_usable(self) -> bool {
		matches!(self, Self::Available | Self::Ready)
	}

	/// Returns the lowercase status name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unknown => "unknown",
			Self::Connected => "connected",
			Self::Available => "available",
			Self::Busy => "busy",
			Self::Ready => "ready",
			Self::Disconnected => "disconnected",
		}
	}
}

impl std::fmt::Display for NodeStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Raw status byte outside the known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown node status: {0}")]
pub struct UnknownStatus(pub u8);

impl TryFrom<u8> for NodeStatus {
	type Error = UnknownStatus;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Self::ALL
			.get(usize::from(value))
			.copied()
			.ok_or(UnknownStatus(value))
	}
}

impl From<NodeStatus> for u8 {
	fn from(status: NodeStatus) -> Self {
		status as u8
	}
}

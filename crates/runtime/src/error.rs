//! Error types for the device manager runtime.

use tdm_protocol::{NodeId, NodeStatus};
use thiserror::Error;

use crate::node::Operation;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the device manager transport.
#[derive(Debug, Clone, Error)]
pub enum Error {
	/// The node is locked by another client.
	#[error("Node {id} is locked by another client")]
	NodeBusy { id: NodeId },

	/// The operation needs a lock this client does not hold.
	#[error("Node {id} is not locked by this client")]
	NotLocked { id: NodeId },

	/// The node is not in a status that allows the operation.
	#[error("Node {id} is unavailable (status: {status})")]
	NodeUnavailable { id: NodeId, status: NodeStatus },

	/// The node is not known to the device manager.
	#[error("Unknown node: {0}")]
	UnknownNode(NodeId),

	/// The program was rejected by the robot-side compiler.
	#[error("Compilation failed: {message}")]
	Compilation { message: String },

	/// The credential was rejected.
	#[error("Authentication with the device manager failed")]
	AuthenticationFailed,

	/// Failed to establish a connection with the device manager.
	#[error("Failed to connect to device manager: {0}")]
	ConnectionFailed(String),

	/// The connection to the device manager is gone.
	#[error("Connection to device manager closed")]
	ConnectionClosed,

	/// The device manager rejected a request.
	#[error("{operation} failed: {message}")]
	Remote { operation: Operation, message: String },
}

impl Error {
	/// Returns true if the error comes from a lock held by someone else.
	pub fn is_lock_conflict(&self) -> bool {
		matches!(self, Error::NodeBusy { .. })
	}

	/// Returns true if the error means the node or the connection is gone.
	pub fn is_disconnect(&self) -> bool {
		match self {
			Error::ConnectionClosed => true,
			Error::NodeUnavailable { status, .. } => *status == NodeStatus::Disconnected,
			_ => false,
		}
	}
}

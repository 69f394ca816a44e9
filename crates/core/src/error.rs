//! Error types for the session layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum Error {
	/// No node is selected.
	#[error("Robot not connected")]
	NotConnected,

	/// A transport step was rejected (lock, program transfer, execution, ...).
	#[error(transparent)]
	Runtime(#[from] tdm_runtime::Error),

	#[error("failed to read session config {path}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid session config {path}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl Error {
	/// Returns the transport error, if this error came from the transport.
	pub fn runtime(&self) -> Option<&tdm_runtime::Error> {
		match self {
			Error::Runtime(err) => Some(err),
			_ => None,
		}
	}

	/// Returns true if no node was selected.
	pub fn is_not_connected(&self) -> bool {
		matches!(self, Error::NotConnected)
	}
}

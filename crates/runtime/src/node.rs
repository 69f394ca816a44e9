//! Per-node operations consumed by the session layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tdm_protocol::{
	EventDescription, EventMap, NodeId, NodeStatus, ProgrammingLanguage, VariableMap,
};

use crate::error::Result;

/// Boxed future returned by node operations.
pub type NodeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Handler invoked with each batch of changed variables.
pub type VariablesHandler = Arc<dyn Fn(VariableMap) + Send + Sync>;

/// Handler invoked with each batch of events emitted by the robot.
pub type EventsHandler = Arc<dyn Fn(EventMap) + Send + Sync>;

/// Shared handle to a node owned by the transport.
pub type NodeHandle = Arc<dyn RemoteNode>;

/// A robot exposed by the device manager.
///
/// Handles are owned by the transport. [`status`](Self::status) reports the
/// status as seen by the client that produced the handle. Every operation is a
/// network round trip and may fail.
pub trait RemoteNode: Send + Sync {
	/// Identity, stable across status updates.
	fn id(&self) -> &NodeId;

	/// Human-readable name.
	fn name(&self) -> String;

	/// Last status reported for this client.
	fn status(&self) -> NodeStatus;

	/// Takes the exclusive lock. Fails when another client holds it.
	fn lock(&self) -> NodeFuture<'_, ()>;

	/// Releases the lock held by this client.
	fn unlock(&self) -> NodeFuture<'_, ()>;

	fn set_variables(&self, variables: VariableMap) -> NodeFuture<'_, ()>;

	fn emit_events(&self, events: EventMap) -> NodeFuture<'_, ()>;

	/// Declares the custom events the next program uses.
	fn set_events_descriptions(&self, events: Vec<EventDescription>) -> NodeFuture<'_, ()>;

	/// Compiles and loads `source`. With `check_only` the program is compiled
	/// but not loaded.
	fn send_program(&self, source: String, check_only: bool) -> NodeFuture<'_, ()>;

	/// Persists `source` as the node's scratch pad.
	fn set_scratch_pad(&self, source: String, language: ProgrammingLanguage)
	-> NodeFuture<'_, ()>;

	/// Starts the loaded program.
	fn run_program(&self) -> NodeFuture<'_, ()>;

	/// Writes the loaded program to non-volatile storage.
	fn flash_program(&self) -> NodeFuture<'_, ()>;

	/// Sets the variables-changed handler, replacing any previous one.
	fn on_variables_changed(&self, handler: VariablesHandler);

	/// Sets the events-received handler, replacing any previous one.
	fn on_events(&self, handler: EventsHandler);
}

impl std::fmt::Debug for dyn RemoteNode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemoteNode")
			.field("id", self.id())
			.field("status", &self.status())
			.finish()
	}
}

/// Node operations, as named in errors and transport journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	Lock,
	Unlock,
	SetVariables,
	EmitEvents,
	SetEventsDescriptions,
	SendProgram,
	CheckProgram,
	SetScratchPad,
	RunProgram,
	FlashProgram,
}

impl Operation {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lock => "lock",
			Self::Unlock => "unlock",
			Self::SetVariables => "set variables",
			Self::EmitEvents => "emit events",
			Self::SetEventsDescriptions => "set events descriptions",
			Self::SendProgram => "send program",
			Self::CheckProgram => "check program",
			Self::SetScratchPad => "set scratch pad",
			Self::RunProgram => "run program",
			Self::FlashProgram => "flash program",
		}
	}
}

impl std::fmt::Display for Operation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

//! [`Node`] handle to a robot exposed by the device manager.

use serde::Serialize;
use tdm_protocol::{
	EventDescription, EventMap, NodeId, NodeStatus, ProgrammingLanguage, VariableMap,
};
use tdm_runtime::{EventsHandler, NodeHandle, VariablesHandler};

use crate::error::Result;

/// A robot known to the session.
///
/// Cheap to clone; clones refer to the same transport node. The status is the
/// one last reported by the device manager for this client.
#[derive(Clone)]
pub struct Node {
	remote: NodeHandle,
}

/// Point-in-time description of a node, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
	pub id: NodeId,
	pub name: String,
	pub status: NodeStatus,
}

impl Node {
	pub fn new(remote: NodeHandle) -> Self {
		Self { remote }
	}

	pub fn id(&self) -> &NodeId {
		self.remote.id()
	}

	pub fn name(&self) -> String {
		self.remote.name()
	}

	pub fn status(&self) -> NodeStatus {
		self.remote.status()
	}

	pub fn info(&self) -> NodeInfo {
		NodeInfo {
			id: self.id().clone(),
			name: self.name(),
			status: self.status(),
		}
	}

	/// Returns the underlying transport handle.
	pub fn remote(&self) -> &NodeHandle {
		&self.remote
	}

	pub async fn lock(&self) -> Result<()> {
		Ok(self.remote.lock().await?)
	}

	pub async fn unlock(&self) -> Result<()> {
		Ok(self.remote.unlock().await?)
	}

	pub async fn set_variables(&self, variables: VariableMap) -> Result<()> {
		Ok(self.remote.set_variables(variables).await?)
	}

	pub async fn emit_events(&self, events: EventMap) -> Result<()> {
		Ok(self.remote.emit_events(events).await?)
	}

	pub async fn set_events_descriptions(&self, events: Vec<EventDescription>) -> Result<()> {
		Ok(self.remote.set_events_descriptions(events).await?)
	}

	pub async fn send_program(&self, source: &str, check_only: bool) -> Result<()> {
		Ok(self.remote.send_program(source.to_string(), check_only).await?)
	}

	pub async fn set_scratch_pad(&self, source: &str, language: ProgrammingLanguage) -> Result<()> {
		Ok(self.remote.set_scratch_pad(source.to_string(), language).await?)
	}

	pub async fn run_program(&self) -> Result<()> {
		Ok(self.remote.run_program().await?)
	}

	pub async fn flash_program(&self) -> Result<()> {
		Ok(self.remote.flash_program().await?)
	}

	pub(crate) fn on_variables_changed(&self, handler: VariablesHandler) {
		self.remote.on_variables_changed(handler);
	}

	pub(crate) fn on_events(&self, handler: EventsHandler) {
		self.remote.on_events(handler);
	}
}

impl From<NodeHandle> for Node {
	fn from(remote: NodeHandle) -> Self {
		Self::new(remote)
	}
}

impl PartialEq for Node {
	/// Nodes are equal when they share an identity.
	fn eq(&self, other: &Self) -> bool {
		self.id() == other.id()
	}
}

impl std::fmt::Debug for Node {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Node")
			.field("id", self.id())
			.field("status", &self.status())
			.finish()
	}
}

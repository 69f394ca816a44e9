//! In-process device manager.
//!
//! [`MemoryDeviceManager`] keeps the observable semantics of a device manager
//! without any wire protocol: nodes in arrival order, a status per client
//! (`Ready` for the lock holder, `Busy` for everyone else), advisory locks,
//! program storage and telemetry push. Each [`MemoryClient`] plays the role of
//! one connected application.
//!
//! Test hooks cover what a real robot would do on its own: status changes,
//! another application seizing a lock, variable and event notifications, and
//! rejected requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tdm_protocol::{
	EventDescription, EventMap, NodeId, NodeStatus, ProgrammingLanguage, VariableMap,
};
use tracing::{debug, trace};

use crate::client::{ClientFuture, CloseHandler, Connector, DeviceManager, NodesChangedHandler};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::node::{EventsHandler, NodeFuture, NodeHandle, Operation, RemoteNode, VariablesHandler};

#[cfg(test)]
mod tests;

/// Identity of one client connected to a [`MemoryDeviceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Owner of locks taken by an application outside this process.
const EXTERNAL_OWNER: ClientId = ClientId(0);

/// Simulated device manager shared by any number of clients.
#[derive(Clone, Default)]
pub struct MemoryDeviceManager {
	shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
	state: Mutex<State>,
	last_client: AtomicU64,
	password: Option<String>,
}

#[derive(Default)]
struct State {
	nodes: IndexMap<NodeId, NodeRecord>,
	clients: IndexMap<ClientId, ClientHooks>,
}

#[derive(Default)]
struct ClientHooks {
	nodes_changed: Vec<NodesChangedHandler>,
	close: Vec<CloseHandler>,
}

struct NodeRecord {
	name: String,
	/// Status before lock ownership is applied.
	presence: NodeStatus,
	owner: Option<ClientId>,
	program: Option<String>,
	scratch_pad: Option<(String, ProgrammingLanguage)>,
	running: bool,
	flashed: Option<String>,
	events_descriptions: Vec<EventDescription>,
	variables: VariableMap,
	emitted: Vec<EventMap>,
	failures: HashMap<Operation, String>,
	variables_handlers: HashMap<ClientId, VariablesHandler>,
	events_handlers: HashMap<ClientId, EventsHandler>,
	journal: Vec<Operation>,
}

impl NodeRecord {
	fn new(name: String) -> Self {
		Self {
			name,
			presence: NodeStatus::Unknown,
			owner: None,
			program: None,
			scratch_pad: None,
			running: false,
			flashed: None,
			events_descriptions: Vec::new(),
			variables: VariableMap::new(),
			emitted: Vec::new(),
			failures: HashMap::new(),
			variables_handlers: HashMap::new(),
			events_handlers: HashMap::new(),
			journal: Vec::new(),
		}
	}

	fn status_for(&self, client: ClientId) -> NodeStatus {
		match (self.presence, self.owner) {
			(NodeStatus::Available, None) => NodeStatus::Available,
			(NodeStatus::Available, Some(owner)) if owner == client => NodeStatus::Ready,
			(NodeStatus::Available, Some(_)) => NodeStatus::Busy,
			(presence, _) => presence,
		}
	}

	/// Applies a reported status. `Busy` and `Ready` are expressed through lock
	/// ownership; any status without a usable VM drops the lock.
	fn apply_status(&mut self, status: NodeStatus) {
		match status {
			NodeStatus::Busy => {
				self.presence = NodeStatus::Available;
				self.owner = Some(EXTERNAL_OWNER);
			}
			NodeStatus::Ready | NodeStatus::Available => {
				self.presence = NodeStatus::Available;
			}
			other => {
				self.presence = other;
				self.owner = None;
				self.running = false;
			}
		}
	}

	fn require_owner(&self, id: &NodeId, client: ClientId) -> Result<()> {
		match self.status_for(client) {
			NodeStatus::Ready => Ok(()),
			NodeStatus::Available | NodeStatus::Busy => Err(Error::NotLocked { id: id.clone() }),
			status => Err(Error::NodeUnavailable {
				id: id.clone(),
				status,
			}),
		}
	}

	fn require_program(&self, operation: Operation) -> Result<&str> {
		self.program.as_deref().ok_or_else(|| Error::Remote {
			operation,
			message: "no program loaded".to_string(),
		})
	}
}

impl Shared {
	fn handle(self: &Arc<Self>, id: NodeId, client: ClientId) -> NodeHandle {
		Arc::new(MemoryNode {
			id,
			client,
			shared: Arc::clone(self),
		})
	}

	/// Delivers the given nodes to every client's nodes-changed handlers.
	fn notify_changed(self: &Arc<Self>, ids: &[NodeId]) {
		let deliveries: Vec<(NodesChangedHandler, Vec<NodeHandle>)> = {
			let state = self.state.lock();
			let mut deliveries = Vec::new();
			for (client, hooks) in &state.clients {
				let nodes: Vec<NodeHandle> = ids
					.iter()
					.filter(|id| state.nodes.contains_key(*id))
					.map(|id| self.handle(id.clone(), *client))
					.collect();
				if nodes.is_empty() {
					continue;
				}
				for handler in &hooks.nodes_changed {
					deliveries.push((Arc::clone(handler), nodes.clone()));
				}
			}
			deliveries
		};

		for (handler, nodes) in deliveries {
			handler(nodes);
		}
	}
}

impl MemoryDeviceManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a device manager that only accepts clients presenting `password`.
	pub fn with_password(password: impl Into<String>) -> Self {
		Self {
			shared: Arc::new(Shared {
				password: Some(password.into()),
				..Default::default()
			}),
		}
	}

	/// Connects a new client without credential checks.
	pub fn client(&self) -> Arc<MemoryClient> {
		let id = ClientId(self.shared.last_client.fetch_add(1, Ordering::SeqCst) + 1);
		self.shared
			.state
			.lock()
			.clients
			.insert(id, ClientHooks::default());
		debug!(client = id.0, "memory client connected");
		Arc::new(MemoryClient {
			id,
			shared: Arc::clone(&self.shared),
		})
	}

	/// Adds a node, or updates name and status of a known one.
	pub fn add_node(
		&self,
		id: impl Into<NodeId>,
		name: impl Into<String>,
		status: NodeStatus,
	) -> NodeId {
		let id = id.into();
		let name = name.into();
		{
			let mut state = self.shared.state.lock();
			let record = state
				.nodes
				.entry(id.clone())
				.or_insert_with(|| NodeRecord::new(name.clone()));
			record.name = name;
			record.apply_status(status);
		}
		self.shared.notify_changed(std::slice::from_ref(&id));
		id
	}

	/// Applies a status reported by the robot and notifies clients.
	pub fn set_status(&self, id: &NodeId, status: NodeStatus) {
		if self.update(id, |record| record.apply_status(status)) {
			self.shared.notify_changed(std::slice::from_ref(id));
		}
	}

	/// Simulates another application taking the lock, whoever held it.
	pub fn take_over(&self, id: &NodeId) {
		if self.update(id, |record| {
			record.presence = NodeStatus::Available;
			record.owner = Some(EXTERNAL_OWNER);
		}) {
			self.shared.notify_changed(std::slice::from_ref(id));
		}
	}

	/// Clears the lock on a node, whoever held it.
	pub fn release(&self, id: &NodeId) {
		if self.update(id, |record| record.owner = None) {
			self.shared.notify_changed(std::slice::from_ref(id));
		}
	}

	/// Makes every later `operation` on the node fail with `message`.
	pub fn fail(&self, id: &NodeId, operation: Operation, message: impl Into<String>) {
		let message = message.into();
		self.update(id, |record| {
			record.failures.insert(operation, message);
		});
	}

	pub fn clear_failures(&self, id: &NodeId) {
		self.update(id, |record| record.failures.clear());
	}

	/// Pushes a variables-changed notification to every client listening on the node.
	pub fn push_variables(&self, id: &NodeId, variables: VariableMap) {
		let handlers: Vec<VariablesHandler> = self
			.read(id, |record| record.variables_handlers.values().cloned().collect())
			.unwrap_or_default();
		for handler in handlers {
			handler(variables.clone());
		}
	}

	/// Pushes an events notification to every client listening on the node.
	pub fn push_events(&self, id: &NodeId, events: EventMap) {
		let handlers: Vec<EventsHandler> = self
			.read(id, |record| record.events_handlers.values().cloned().collect())
			.unwrap_or_default();
		for handler in handlers {
			handler(events.clone());
		}
	}

	/// Closes every client connection. Locks are dropped.
	pub fn shutdown(&self) {
		let handlers: Vec<CloseHandler> = {
			let mut state = self.shared.state.lock();
			for record in state.nodes.values_mut() {
				record.owner = None;
				record.running = false;
			}
			state
				.clients
				.drain(..)
				.flat_map(|(_, hooks)| hooks.close)
				.collect()
		};
		debug!(handlers = handlers.len(), "memory device manager shut down");
		for handler in handlers {
			handler();
		}
	}

	pub fn status_for(&self, id: &NodeId, client: ClientId) -> Option<NodeStatus> {
		self.read(id, |record| record.status_for(client))
	}

	pub fn owner(&self, id: &NodeId) -> Option<ClientId> {
		self.read(id, |record| record.owner).flatten()
	}

	/// Program loaded by the last non-check `send_program`.
	pub fn program(&self, id: &NodeId) -> Option<String> {
		self.read(id, |record| record.program.clone()).flatten()
	}

	pub fn scratch_pad(&self, id: &NodeId) -> Option<(String, ProgrammingLanguage)> {
		self.read(id, |record| record.scratch_pad.clone()).flatten()
	}

	pub fn is_running(&self, id: &NodeId) -> bool {
		self.read(id, |record| record.running).unwrap_or(false)
	}

	/// Program persisted by the last `flash_program`.
	pub fn flashed_program(&self, id: &NodeId) -> Option<String> {
		self.read(id, |record| record.flashed.clone()).flatten()
	}

	pub fn events_descriptions(&self, id: &NodeId) -> Vec<EventDescription> {
		self.read(id, |record| record.events_descriptions.clone())
			.unwrap_or_default()
	}

	/// Variables written by clients.
	pub fn variables(&self, id: &NodeId) -> VariableMap {
		self.read(id, |record| record.variables.clone())
			.unwrap_or_default()
	}

	/// Event batches emitted by clients, oldest first.
	pub fn emitted_events(&self, id: &NodeId) -> Vec<EventMap> {
		self.read(id, |record| record.emitted.clone())
			.unwrap_or_default()
	}

	/// Successful operations on the node, oldest first.
	pub fn journal(&self, id: &NodeId) -> Vec<Operation> {
		self.read(id, |record| record.journal.clone())
			.unwrap_or_default()
	}

	fn read<T>(&self, id: &NodeId, f: impl FnOnce(&NodeRecord) -> T) -> Option<T> {
		self.shared.state.lock().nodes.get(id).map(f)
	}

	fn update(&self, id: &NodeId, f: impl FnOnce(&mut NodeRecord)) -> bool {
		match self.shared.state.lock().nodes.get_mut(id) {
			Some(record) => {
				f(record);
				true
			}
			None => false,
		}
	}
}

impl Connector for MemoryDeviceManager {
	fn connect<'a>(&'a self, config: &'a ClientConfig) -> ClientFuture<'a> {
		Box::pin(async move {
			if let Some(expected) = &self.shared.password {
				if config.password.as_deref() != Some(expected.as_str()) {
					return Err(Error::AuthenticationFailed);
				}
			}
			debug!(url = %config.url, "connecting memory client");
			let client: Arc<dyn DeviceManager> = self.client();
			Ok(client)
		})
	}
}

/// One application's connection to a [`MemoryDeviceManager`].
pub struct MemoryClient {
	id: ClientId,
	shared: Arc<Shared>,
}

impl MemoryClient {
	pub fn id(&self) -> ClientId {
		self.id
	}

	/// Handle to a node as seen by this client.
	pub fn node(&self, id: &NodeId) -> Option<NodeHandle> {
		let known = self.shared.state.lock().nodes.contains_key(id);
		known.then(|| self.shared.handle(id.clone(), self.id))
	}

	/// Handles to every node, in arrival order.
	pub fn nodes(&self) -> Vec<NodeHandle> {
		let ids: Vec<NodeId> = self.shared.state.lock().nodes.keys().cloned().collect();
		ids.into_iter()
			.map(|id| self.shared.handle(id, self.id))
			.collect()
	}
}

impl DeviceManager for MemoryClient {
	fn on_nodes_changed(&self, handler: NodesChangedHandler) {
		let registered = match self.shared.state.lock().clients.get_mut(&self.id) {
			Some(hooks) => {
				hooks.nodes_changed.push(Arc::clone(&handler));
				true
			}
			None => false,
		};
		if !registered {
			return;
		}
		let nodes = self.nodes();
		if !nodes.is_empty() {
			handler(nodes);
		}
	}

	fn on_close(&self, handler: CloseHandler) {
		if let Some(hooks) = self.shared.state.lock().clients.get_mut(&self.id) {
			hooks.close.push(handler);
		}
	}
}

/// A node handle bound to one client.
pub struct MemoryNode {
	id: NodeId,
	client: ClientId,
	shared: Arc<Shared>,
}

impl MemoryNode {
	/// Runs `apply` against the node record after checking injected failures.
	fn perform<T>(
		&self,
		operation: Operation,
		apply: impl FnOnce(&mut NodeRecord, &NodeId, ClientId) -> Result<T>,
	) -> Result<T> {
		let mut state = self.shared.state.lock();
		let record = state
			.nodes
			.get_mut(&self.id)
			.ok_or_else(|| Error::UnknownNode(self.id.clone()))?;

		if let Some(message) = record.failures.get(&operation).cloned() {
			return Err(match operation {
				Operation::SendProgram | Operation::CheckProgram => Error::Compilation { message },
				_ => Error::Remote { operation, message },
			});
		}

		let value = apply(record, &self.id, self.client)?;
		record.journal.push(operation);
		trace!(node = %self.id, client = self.client.0, %operation, "memory node operation");
		Ok(value)
	}
}

impl RemoteNode for MemoryNode {
	fn id(&self) -> &NodeId {
		&self.id
	}

	fn name(&self) -> String {
		self.shared
			.state
			.lock()
			.nodes
			.get(&self.id)
			.map(|record| record.name.clone())
			.unwrap_or_default()
	}

	fn status(&self) -> NodeStatus {
		self.shared
			.state
			.lock()
			.nodes
			.get(&self.id)
			.map(|record| record.status_for(self.client))
			.unwrap_or(NodeStatus::Disconnected)
	}

	fn lock(&self) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			let acquired = self.perform(Operation::Lock, |record, id, client| {
				match record.status_for(client) {
					NodeStatus::Ready => Ok(false),
					NodeStatus::Available => {
						record.owner = Some(client);
						Ok(true)
					}
					NodeStatus::Busy => Err(Error::NodeBusy { id: id.clone() }),
					status => Err(Error::NodeUnavailable {
						id: id.clone(),
						status,
					}),
				}
			})?;
			if acquired {
				self.shared.notify_changed(std::slice::from_ref(&self.id));
			}
			Ok(())
		})
	}

	fn unlock(&self) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::Unlock, |record, id, client| {
				record.require_owner(id, client)?;
				record.owner = None;
				Ok(())
			})?;
			self.shared.notify_changed(std::slice::from_ref(&self.id));
			Ok(())
		})
	}

	fn set_variables(&self, variables: VariableMap) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::SetVariables, |record, id, client| {
				record.require_owner(id, client)?;
				record.variables.extend(variables);
				Ok(())
			})
		})
	}

	fn emit_events(&self, events: EventMap) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::EmitEvents, |record, id, client| {
				record.require_owner(id, client)?;
				record.emitted.push(events);
				Ok(())
			})
		})
	}

	fn set_events_descriptions(&self, events: Vec<EventDescription>) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::SetEventsDescriptions, |record, id, client| {
				record.require_owner(id, client)?;
				record.events_descriptions = events;
				Ok(())
			})
		})
	}

	fn send_program(&self, source: String, check_only: bool) -> NodeFuture<'_, ()> {
		let operation = if check_only {
			Operation::CheckProgram
		} else {
			Operation::SendProgram
		};
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(operation, |record, id, client| {
				record.require_owner(id, client)?;
				if !check_only {
					record.program = Some(source);
					record.running = false;
				}
				Ok(())
			})
		})
	}

	fn set_scratch_pad(
		&self,
		source: String,
		language: ProgrammingLanguage,
	) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::SetScratchPad, |record, id, client| {
				record.require_owner(id, client)?;
				record.scratch_pad = Some((source, language));
				Ok(())
			})
		})
	}

	fn run_program(&self) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::RunProgram, |record, id, client| {
				record.require_owner(id, client)?;
				record.require_program(Operation::RunProgram)?;
				record.running = true;
				Ok(())
			})
		})
	}

	fn flash_program(&self) -> NodeFuture<'_, ()> {
		Box::pin(async move {
			tokio::task::yield_now().await;
			self.perform(Operation::FlashProgram, |record, id, client| {
				record.require_owner(id, client)?;
				let program = record.require_program(Operation::FlashProgram)?.to_string();
				record.flashed = Some(program);
				Ok(())
			})
		})
	}

	fn on_variables_changed(&self, handler: VariablesHandler) {
		if let Some(record) = self.shared.state.lock().nodes.get_mut(&self.id) {
			record.variables_handlers.insert(self.client, handler);
		}
	}

	fn on_events(&self, handler: EventsHandler) {
		if let Some(record) = self.shared.state.lock().nodes.get_mut(&self.id) {
			record.events_handlers.insert(self.client, handler);
		}
	}
}

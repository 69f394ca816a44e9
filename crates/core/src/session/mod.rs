//! Session over one device manager client.
//!
//! A [`Session`] tracks the nodes reported by the device manager, holds the
//! lock on at most one of them (the selected node), relays its telemetry and
//! runs programs on it.
//!
//! # Notifications
//!
//! Transport notifications are queued and processed in arrival order by a
//! background task. Node statuses are captured when a notification arrives,
//! not when it is handled, so a loss followed by a recovery is still seen.
//! Handling a node-list update merges it into the registry, detects a lost
//! lock, reconnects to the configured target when nothing is
//! selected, then fires `on_any_node_change`. [`Session::flush`] waits until
//! every notification queued before the call has been handled.
//!
//! `connect`, `close` and notification handling share one async gate, so two
//! selection scans never interleave and a second lock is never taken before
//! the first is released.

mod program;
mod telemetry;


use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tdm_protocol::{EventDescription, NodeId, NodeStatus};
use tdm_runtime::{Connector, DeviceManager, NodeHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::node::{Node, NodeInfo};
use crate::options::{SessionOptions, Target};
use crate::registry::NodeRegistry;

pub use program::{Completion, SkipReason, run_on_node, run_on_node_with};

/// Handle to a session. Clones share the same session.
///
/// The background task stops once the last handle is dropped.
#[derive(Clone)]
pub struct Session {
	inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
	options: SessionOptions,
	state: Mutex<SessionState>,
	/// Serializes selection changes.
	gate: tokio::sync::Mutex<()>,
	notifications: mpsc::UnboundedSender<Notification>,
	/// Sequence number of the next node-list notification.
	sequence: Arc<AtomicU64>,
	_client: Arc<dyn DeviceManager>,
	_cancel: oneshot::Sender<()>,
}

#[derive(Default)]
struct SessionState {
	registry: NodeRegistry,
	selected: Option<NodeId>,
	/// Notifications numbered below this were captured before the lock was
	/// taken and say nothing about it.
	selected_since: u64,
	variables: HashMap<String, Vec<i32>>,
	custom_events: Option<Vec<EventDescription>>,
}

enum Notification {
	NodesChanged(NodeUpdate),
	Closed,
	Flush(oneshot::Sender<()>),
}

/// One node-list notification with the statuses reported at delivery.
struct NodeUpdate {
	sequence: u64,
	nodes: Vec<(Node, NodeStatus)>,
}

impl Session {
	/// Starts a session on an open client.
	///
	/// Must be called within a Tokio runtime.
	pub fn new(client: Arc<dyn DeviceManager>, options: SessionOptions) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let (cancel_tx, cancel_rx) = oneshot::channel();
		let sequence = Arc::new(AtomicU64::new(0));

		let inner = Arc::new(SessionInner {
			options,
			state: Mutex::new(SessionState::default()),
			gate: tokio::sync::Mutex::new(()),
			notifications: tx.clone(),
			sequence: Arc::clone(&sequence),
			_client: Arc::clone(&client),
			_cancel: cancel_tx,
		});

		tokio::spawn(notification_loop(Arc::downgrade(&inner), rx, cancel_rx));

		let nodes_tx = tx.clone();
		client.on_nodes_changed(Arc::new(move |handles: Vec<NodeHandle>| {
			let nodes = handles
				.into_iter()
				.map(|remote| {
					let node = Node::from(remote);
					let status = node.status();
					(node, status)
				})
				.collect();
			let update = NodeUpdate {
				sequence: sequence.fetch_add(1, Ordering::SeqCst),
				nodes,
			};
			let _ = nodes_tx.send(Notification::NodesChanged(update));
		}));
		client.on_close(Arc::new(move || {
			let _ = tx.send(Notification::Closed);
		}));

		debug!(uuid = ?inner.options.target, "session started");
		Self { inner }
	}

	/// Opens a client through `connector` with the endpoint and credential
	/// from `options`, then starts a session on it.
	pub async fn open(connector: &dyn Connector, options: SessionOptions) -> Result<Self> {
		let client = connector.connect(&options.client).await?;
		info!(url = %options.client.url, "connected to device manager");
		Ok(Self::new(client, options))
	}

	/// Releases any selected node, then locks the first available node
	/// matching `target`.
	///
	/// Returns the identity of the newly selected node, or `None` when no
	/// candidate could be locked. Lock failures on individual candidates are
	/// logged and the scan moves on. A failure to release the previous node
	/// is returned and no scan takes place.
	pub async fn connect(&self, target: impl Into<Target>) -> Result<Option<NodeId>> {
		let target = target.into();
		let _gate = self.inner.gate.lock().await;
		self.inner.connect_locked(&target).await
	}

	/// Releases the selected node. Does nothing when nothing is selected.
	///
	/// The selection is cleared even when the release fails.
	pub async fn close(&self) -> Result<()> {
		let _gate = self.inner.gate.lock().await;
		self.inner.close_locked().await
	}

	/// Returns true if a node is selected, whatever its current status.
	pub fn is_connected(&self) -> bool {
		self.inner.state.lock().selected.is_some()
	}

	/// Returns true if a node is selected and reported `Ready`.
	pub fn can_run(&self) -> bool {
		self.selected_node()
			.is_some_and(|node| node.status() == NodeStatus::Ready)
	}

	pub fn selected_node(&self) -> Option<Node> {
		self.inner.selected_node()
	}

	/// Known nodes in order of first appearance.
	pub fn nodes(&self) -> Vec<NodeInfo> {
		self.inner.state.lock().registry.infos()
	}

	pub fn node(&self, id: &NodeId) -> Option<Node> {
		self.inner.state.lock().registry.get(id).cloned()
	}

	pub fn options(&self) -> &SessionOptions {
		&self.inner.options
	}

	/// Waits until every notification received before this call has been
	/// handled.
	///
	/// Must not be awaited from inside a session callback.
	pub async fn flush(&self) {
		let (tx, rx) = oneshot::channel();
		if self.inner.notifications.send(Notification::Flush(tx)).is_ok() {
			let _ = rx.await;
		}
	}
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("Session")
			.field("selected", &state.selected)
			.field("nodes", &state.registry.len())
			.field("options", &self.inner.options)
			.finish()
	}
}

async fn notification_loop(
	session: Weak<SessionInner>,
	mut rx: mpsc::UnboundedReceiver<Notification>,
	mut cancel: oneshot::Receiver<()>,
) {
	loop {
		let notification = tokio::select! {
			biased;
			_ = &mut cancel => break,
			notification = rx.recv() => match notification {
				Some(notification) => notification,
				None => break,
			},
		};
		let Some(inner) = session.upgrade() else {
			break;
		};
		inner.handle(notification).await;
	}
	debug!("session notification loop stopped");
}

impl SessionInner {
	async fn handle(self: &Arc<Self>, notification: Notification) {
		match notification {
			Notification::NodesChanged(update) => self.nodes_changed(update).await,
			Notification::Closed => self.connection_closed().await,
			Notification::Flush(done) => {
				let _ = done.send(());
			}
		}
	}

	async fn nodes_changed(self: &Arc<Self>, update: NodeUpdate) {
		let _gate = self.gate.lock().await;

		debug!(count = update.nodes.len(), sequence = update.sequence, "merging node update");
		let lost = update
			.nodes
			.iter()
			.any(|(node, status)| self.clear_if_lost(node.id(), *status, update.sequence));
		self.state
			.lock()
			.registry
			.merge(update.nodes.into_iter().map(|(node, _)| node));
		if lost {
			self.notify_change(false);
		}

		let idle = self.state.lock().selected.is_none();
		if let Some(target) = self.options.target.as_ref().filter(|_| idle) {
			if let Err(err) = self.connect_locked(target).await {
				warn!(uuid = %target, error = %err, "automatic connection failed");
			}
		}

		self.notify_any_node_change();
	}

	async fn connection_closed(&self) {
		let _gate = self.gate.lock().await;

		let dropped = self.state.lock().selected.take();
		match dropped {
			Some(id) => info!(node = %id, "connection closed, selection dropped"),
			None => info!("connection closed"),
		}
		if self.options.target.is_some() {
			self.notify_change(false);
		}
		self.notify_any_node_change();
	}

	/// Scans the registry for a node to lock. The caller holds the gate.
	async fn connect_locked(self: &Arc<Self>, target: &Target) -> Result<Option<NodeId>> {
		self.close_locked().await?;

		let candidates = self.state.lock().registry.snapshot();
		for node in candidates {
			if node.status() != NodeStatus::Available || !target.matches(node.id()) {
				continue;
			}

			info!(node = %node.id(), name = %node.name(), "locking node");
			match node.lock().await {
				Ok(()) => {
					info!(node = %node.id(), "node locked");
					{
						let mut state = self.state.lock();
						state.selected = Some(node.id().clone());
						state.selected_since = self.sequence.load(Ordering::SeqCst);
					}
					self.notify_change(true);
					self.attach_telemetry(&node);
					return Ok(Some(node.id().clone()));
				}
				Err(err) => {
					warn!(node = %node.id(), name = %node.name(), error = %err, "unable to lock node");
				}
			}
		}

		debug!(uuid = %target, "no node selected");
		Ok(None)
	}

	/// Unlocks and clears the selection. The caller holds the gate.
	async fn close_locked(&self) -> Result<()> {
		let node = {
			let mut state = self.state.lock();
			let Some(id) = state.selected.take() else {
				return Ok(());
			};
			state.registry.get(&id).cloned()
		};
		let Some(node) = node else {
			return Ok(());
		};

		info!(node = %node.id(), "unlocking node");
		node.unlock().await
	}

	/// Clears the selection if `id` is the selected node and notification
	/// `sequence` reported it in a status it cannot stay selected in.
	/// Returns true if the selection was cleared.
	fn clear_if_lost(&self, id: &NodeId, status: NodeStatus, sequence: u64) -> bool {
		let mut state = self.state.lock();
		if state.selected.as_ref() != Some(id) || sequence < state.selected_since {
			return false;
		}
		if status.is_usable() {
			return false;
		}
		state.selected = None;
		warn!(node = %id, %status, "selected node lost");
		true
	}

	fn selected_node(&self) -> Option<Node> {
		let state = self.state.lock();
		let id = state.selected.as_ref()?;
		state.registry.get(id).cloned()
	}

	fn notify_change(&self, connected: bool) {
		if let Some(on_change) = &self.options.on_change {
			on_change(connected);
		}
	}

	fn notify_any_node_change(&self) {
		if let Some(on_any_node_change) = &self.options.on_any_node_change {
			on_any_node_change();
		}
	}
}

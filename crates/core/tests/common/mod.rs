// Shared fixtures for session integration tests.
//
// Sessions run against the in-process device manager; `Recorder` captures
// every callback so tests can assert on exact sequences.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tdm::{MemoryDeviceManager, NodeId, NodeStatus, Session, SessionOptions, Variables};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Callback log shared with the session.
#[derive(Clone, Default)]
pub struct Recorder {
	pub changes: Arc<Mutex<Vec<bool>>>,
	pub node_changes: Arc<Mutex<usize>>,
	pub variables: Arc<Mutex<Vec<Variables>>>,
	pub events: Arc<Mutex<Vec<(String, Vec<i32>)>>>,
	pub failures: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
	/// Options wired to every recorder field, variables in callback mode.
	pub fn options(&self) -> SessionOptions {
		let changes = Arc::clone(&self.changes);
		let node_changes = Arc::clone(&self.node_changes);
		let variables = Arc::clone(&self.variables);
		let events = Arc::clone(&self.events);
		let failures = Arc::clone(&self.failures);

		SessionOptions::new()
			.on_change(move |connected| changes.lock().push(connected))
			.on_any_node_change(move || *node_changes.lock() += 1)
			.on_variables(move |batch| variables.lock().push(batch))
			.on_event(move |name, value| events.lock().push((name.to_string(), value)))
			.on_failure(move |err| failures.lock().push(err.to_string()))
	}

	pub fn changes(&self) -> Vec<bool> {
		self.changes.lock().clone()
	}

	pub fn node_changes(&self) -> usize {
		*self.node_changes.lock()
	}

	pub fn failures(&self) -> Vec<String> {
		self.failures.lock().clone()
	}
}

/// Device manager exposing `a` and `b`, both available.
pub fn two_nodes() -> (MemoryDeviceManager, NodeId, NodeId) {
	let manager = MemoryDeviceManager::new();
	let a = manager.add_node("a", "Thymio A", NodeStatus::Available);
	let b = manager.add_node("b", "Thymio B", NodeStatus::Available);
	(manager, a, b)
}

/// Starts a session and waits for the initial node list.
pub async fn start(manager: &MemoryDeviceManager, options: SessionOptions) -> Session {
	init_tracing();
	let session = Session::new(manager.client(), options);
	settle(&session).await;
	session
}

/// Drains notifications, including those produced while handling them
/// (lock and unlock echoes).
pub async fn settle(session: &Session) {
	for _ in 0..3 {
		session.flush().await;
	}
}

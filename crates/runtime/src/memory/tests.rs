use std::sync::Arc;

use parking_lot::Mutex;
use tdm_protocol::VariableValue;

use super::*;

fn manager_with_node() -> (MemoryDeviceManager, NodeId) {
	let manager = MemoryDeviceManager::new();
	let id = manager.add_node("node-1", "Thymio II", NodeStatus::Available);
	(manager, id)
}

#[test]
fn test_status_is_relative_to_client() {
	let (manager, id) = manager_with_node();
	let first = manager.client();
	let second = manager.client();

	assert_eq!(manager.status_for(&id, first.id()), Some(NodeStatus::Available));

	manager.shared.state.lock().nodes.get_mut(&id).unwrap().owner = Some(first.id());

	assert_eq!(manager.status_for(&id, first.id()), Some(NodeStatus::Ready));
	assert_eq!(manager.status_for(&id, second.id()), Some(NodeStatus::Busy));
}

#[tokio::test]
async fn test_lock_is_exclusive() {
	let (manager, id) = manager_with_node();
	let first = manager.client().node(&id).unwrap();
	let second = manager.client().node(&id).unwrap();

	first.lock().await.unwrap();
	assert_eq!(first.status(), NodeStatus::Ready);
	assert_eq!(second.status(), NodeStatus::Busy);

	let err = second.lock().await.unwrap_err();
	assert!(err.is_lock_conflict(), "Expected lock conflict, got: {:?}", err);

	first.unlock().await.unwrap();
	second.lock().await.unwrap();
	assert_eq!(first.status(), NodeStatus::Busy);
}

#[tokio::test]
async fn test_unlock_requires_ownership() {
	let (manager, id) = manager_with_node();
	let node = manager.client().node(&id).unwrap();

	let err = node.unlock().await.unwrap_err();
	assert!(matches!(err, Error::NotLocked { .. }));
}

#[tokio::test]
async fn test_program_lifecycle() {
	let (manager, id) = manager_with_node();
	let node = manager.client().node(&id).unwrap();
	node.lock().await.unwrap();

	node.send_program("var x = 1".to_string(), true).await.unwrap();
	assert_eq!(manager.program(&id), None);

	node.send_program("var x = 2".to_string(), false).await.unwrap();
	node.set_scratch_pad("var x = 2".to_string(), ProgrammingLanguage::Aseba)
		.await
		.unwrap();
	node.run_program().await.unwrap();
	node.flash_program().await.unwrap();

	assert_eq!(manager.program(&id).as_deref(), Some("var x = 2"));
	assert_eq!(
		manager.scratch_pad(&id),
		Some(("var x = 2".to_string(), ProgrammingLanguage::Aseba))
	);
	assert!(manager.is_running(&id));
	assert_eq!(manager.flashed_program(&id).as_deref(), Some("var x = 2"));
	assert_eq!(
		manager.journal(&id),
		vec![
			Operation::Lock,
			Operation::CheckProgram,
			Operation::SendProgram,
			Operation::SetScratchPad,
			Operation::RunProgram,
			Operation::FlashProgram,
		]
	);
}

#[tokio::test]
async fn test_program_operations_require_lock() {
	let (manager, id) = manager_with_node();
	let node = manager.client().node(&id).unwrap();

	let err = node.send_program("var x".to_string(), false).await.unwrap_err();
	assert!(matches!(err, Error::NotLocked { .. }));

	let err = node.flash_program().await.unwrap_err();
	assert!(matches!(err, Error::NotLocked { .. }));
	assert!(manager.journal(&id).is_empty());
}

#[tokio::test]
async fn test_run_without_program_is_rejected() {
	let (manager, id) = manager_with_node();
	let node = manager.client().node(&id).unwrap();
	node.lock().await.unwrap();

	let err = node.run_program().await.unwrap_err();
	assert_eq!(err.to_string(), "run program failed: no program loaded");
}

#[tokio::test]
async fn test_injected_failures() {
	let (manager, id) = manager_with_node();
	let node = manager.client().node(&id).unwrap();
	node.lock().await.unwrap();

	manager.fail(&id, Operation::SendProgram, "syntax error at line 1");
	let err = node.send_program("oops".to_string(), false).await.unwrap_err();
	assert!(matches!(err, Error::Compilation { .. }));

	manager.clear_failures(&id);
	node.send_program("var x".to_string(), false).await.unwrap();
}

#[test]
fn test_nodes_changed_replays_current_nodes() {
	let (manager, id) = manager_with_node();
	let client = manager.client();
	let seen: Arc<Mutex<Vec<(NodeId, NodeStatus)>>> = Arc::default();

	let sink = Arc::clone(&seen);
	client.on_nodes_changed(Arc::new(move |nodes: Vec<NodeHandle>| {
		let mut seen = sink.lock();
		for node in nodes {
			seen.push((node.id().clone(), node.status()));
		}
	}));
	assert_eq!(seen.lock().clone(), vec![(id.clone(), NodeStatus::Available)]);

	manager.take_over(&id);
	manager.set_status(&id, NodeStatus::Disconnected);

	assert_eq!(
		seen.lock().clone(),
		vec![
			(id.clone(), NodeStatus::Available),
			(id.clone(), NodeStatus::Busy),
			(id, NodeStatus::Disconnected),
		]
	);
}

#[test]
fn test_disconnect_drops_lock() {
	let (manager, id) = manager_with_node();
	let client = manager.client();
	manager.shared.state.lock().nodes.get_mut(&id).unwrap().owner = Some(client.id());

	manager.set_status(&id, NodeStatus::Disconnected);
	assert_eq!(manager.owner(&id), None);

	manager.set_status(&id, NodeStatus::Available);
	assert_eq!(manager.status_for(&id, client.id()), Some(NodeStatus::Available));
}

#[test]
fn test_telemetry_reaches_listening_clients() {
	let (manager, id) = manager_with_node();
	let node = manager.client().node(&id).unwrap();
	let received: Arc<Mutex<Vec<VariableMap>>> = Arc::default();

	let sink = Arc::clone(&received);
	node.on_variables_changed(Arc::new(move |vars: VariableMap| sink.lock().push(vars)));

	let mut vars = VariableMap::new();
	vars.insert("temperature".to_string(), VariableValue::Scalar(215));
	manager.push_variables(&id, vars.clone());

	assert_eq!(received.lock().clone(), vec![vars]);
}

#[test]
fn test_shutdown_fires_close_handlers() {
	let manager = MemoryDeviceManager::new();
	let client = manager.client();
	let closed = Arc::new(Mutex::new(0));

	let counter = Arc::clone(&closed);
	client.on_close(Arc::new(move || *counter.lock() += 1));

	manager.shutdown();
	manager.shutdown();
	assert_eq!(*closed.lock(), 1);
}

#[tokio::test]
async fn test_connector_checks_password() {
	let manager = MemoryDeviceManager::with_password("secret");

	let err = manager
		.connect(&ClientConfig::default())
		.await
		.err()
		.expect("connection without password should fail");
	assert!(matches!(err, Error::AuthenticationFailed));

	let config = ClientConfig::default().with_password(Some("secret".to_string()));
	assert!(manager.connect(&config).await.is_ok());
}

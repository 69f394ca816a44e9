// Program runner tests: run, check, flash and failure routing.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Recorder, settle, start, two_nodes};
use parking_lot::Mutex;
use tdm::{
	Callbacks, Completion, EventDescription, Node, NodeStatus, Operation, ProgrammingLanguage,
	SessionOptions, SkipReason, run_on_node, run_on_node_with,
};

const PROGRAM: &str = "motor.left.target = 200\nmotor.right.target = 200";

#[derive(Clone, Default)]
struct Outcome {
	successes: Arc<AtomicUsize>,
	failures: Arc<Mutex<Vec<String>>>,
}

impl Outcome {
	fn callbacks(&self) -> Callbacks {
		let successes = Arc::clone(&self.successes);
		let failures = Arc::clone(&self.failures);
		Callbacks::new()
			.on_success(move || {
				successes.fetch_add(1, Ordering::SeqCst);
			})
			.on_failure(move |err| failures.lock().push(err.to_string()))
	}

	fn successes(&self) -> usize {
		self.successes.load(Ordering::SeqCst)
	}

	fn failures(&self) -> Vec<String> {
		self.failures.lock().clone()
	}
}

#[tokio::test]
async fn test_run_loads_saves_and_starts_program() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;

	assert_eq!(session.run(PROGRAM).await.unwrap(), Completion::Done);

	assert_eq!(manager.program(&a).as_deref(), Some(PROGRAM));
	assert_eq!(
		manager.scratch_pad(&a),
		Some((PROGRAM.to_string(), ProgrammingLanguage::Aseba))
	);
	assert!(manager.is_running(&a));
	assert_eq!(
		manager.journal(&a),
		vec![
			Operation::Lock,
			Operation::SendProgram,
			Operation::SetScratchPad,
			Operation::RunProgram,
		]
	);
}

#[tokio::test]
async fn test_run_declares_custom_events_first() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	let events = vec![EventDescription::new("ping", 0), EventDescription::new("pos", 2)];
	session.declare_custom_events(events.clone());

	session.run("onevent ping\nemit pos [1, 2]").await.unwrap();

	assert_eq!(manager.events_descriptions(&a), events);
	assert_eq!(manager.journal(&a)[1], Operation::SetEventsDescriptions);
	assert_eq!(manager.journal(&a)[2], Operation::SendProgram);
}

#[tokio::test]
async fn test_run_without_selection_is_not_connected() {
	let (manager, _, _) = two_nodes();
	let session = start(&manager, SessionOptions::new()).await;

	let err = session.run(PROGRAM).await.unwrap_err();
	assert!(err.is_not_connected());
	assert_eq!(err.to_string(), "Robot not connected");
}

#[tokio::test]
async fn test_run_with_routes_not_connected_to_call_site() {
	let (manager, _, _) = two_nodes();
	let recorder = Recorder::default();
	let session = start(&manager, recorder.options()).await;
	let outcome = Outcome::default();

	session.run_with(PROGRAM, outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 0);
	assert_eq!(outcome.failures(), vec!["Robot not connected".to_string()]);
	assert!(recorder.failures().is_empty());
}

#[tokio::test]
async fn test_run_with_falls_back_to_session_handler() {
	let (manager, _, _) = two_nodes();
	let recorder = Recorder::default();
	let session = start(&manager, recorder.options()).await;

	session.run_with(PROGRAM, Callbacks::new()).await;

	assert_eq!(recorder.failures(), vec!["Robot not connected".to_string()]);
}

#[tokio::test]
async fn test_run_with_reports_success_once() {
	let (manager, _, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	let outcome = Outcome::default();

	session.run_with(PROGRAM, outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 1);
	assert!(outcome.failures().is_empty());
}

#[tokio::test]
async fn test_run_step_failure_aborts_remaining_steps() {
	let (manager, a, _) = two_nodes();
	let recorder = Recorder::default();
	let session = start(&manager, recorder.options().with_target("auto")).await;
	manager.fail(&a, Operation::SendProgram, "syntax error line 1");

	session.run_with(PROGRAM, Callbacks::new()).await;

	assert_eq!(recorder.failures(), vec!["Compilation failed: syntax error line 1".to_string()]);
	assert_eq!(manager.journal(&a), vec![Operation::Lock]);
	assert!(session.is_connected());
}

#[tokio::test]
async fn test_run_skips_node_that_is_not_ready() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	let outcome = Outcome::default();

	// The update is not processed yet: the node is still selected.
	manager.set_status(&a, NodeStatus::Connected);
	assert_eq!(
		session.run(PROGRAM).await.unwrap(),
		Completion::Skipped(SkipReason::NotReady(NodeStatus::Connected))
	);

	session.run_with(PROGRAM, outcome.callbacks()).await;
	assert_eq!(outcome.successes(), 0);
	assert!(outcome.failures().is_empty());
	assert_eq!(manager.program(&a), None);
}

#[tokio::test]
async fn test_check_compiles_without_loading() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	session.run(PROGRAM).await.unwrap();

	assert_eq!(session.check("var x = 1").await.unwrap(), Completion::Done);

	assert_eq!(manager.program(&a).as_deref(), Some(PROGRAM));
	assert_eq!(manager.journal(&a).last(), Some(&Operation::CheckProgram));
}

#[tokio::test]
async fn test_check_without_selection_invokes_no_callback() {
	let (manager, _, _) = two_nodes();
	let recorder = Recorder::default();
	let session = start(&manager, recorder.options()).await;
	let outcome = Outcome::default();

	assert_eq!(
		session.check(PROGRAM).await.unwrap(),
		Completion::Skipped(SkipReason::NotSelected)
	);
	session.check_with(PROGRAM, outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 0);
	assert!(outcome.failures().is_empty());
	assert!(recorder.failures().is_empty());
}

#[tokio::test]
async fn test_check_reports_compilation_errors() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	manager.fail(&a, Operation::CheckProgram, "unknown variable y");
	let outcome = Outcome::default();

	session.check_with("y = 1", outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 0);
	assert_eq!(outcome.failures(), vec!["Compilation failed: unknown variable y".to_string()]);
}

#[tokio::test]
async fn test_flash_persists_program() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	let outcome = Outcome::default();

	session.flash_with(PROGRAM, outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 1);
	assert_eq!(manager.flashed_program(&a).as_deref(), Some(PROGRAM));
	assert!(!manager.is_running(&a));
}

#[tokio::test]
async fn test_flash_without_lock_routes_failure() {
	let (manager, _, _) = two_nodes();
	let recorder = Recorder::default();
	let session = start(&manager, recorder.options()).await;
	let outcome = Outcome::default();

	assert!(session.flash(PROGRAM).await.unwrap_err().is_not_connected());

	session.flash_with(PROGRAM, outcome.callbacks()).await;
	assert_eq!(outcome.failures(), vec!["Robot not connected".to_string()]);

	session.flash_with(PROGRAM, Callbacks::new()).await;
	assert_eq!(recorder.failures(), vec!["Robot not connected".to_string()]);
}

#[tokio::test]
async fn test_flash_failure_is_routed() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new().with_target("auto")).await;
	manager.fail(&a, Operation::FlashProgram, "eeprom write error");
	let outcome = Outcome::default();

	session.flash_with(PROGRAM, outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 0);
	assert_eq!(
		outcome.failures(),
		vec!["flash program failed: eeprom write error".to_string()]
	);
	assert_eq!(manager.flashed_program(&a), None);
}

#[tokio::test]
async fn test_run_on_node_locks_runs_and_releases() {
	let (manager, _, b) = two_nodes();
	let session = start(&manager, SessionOptions::new()).await;
	let node: Node = session.node(&b).unwrap();

	run_on_node(&node, PROGRAM).await.unwrap();

	assert!(manager.is_running(&b));
	assert_eq!(manager.owner(&b), None);
	assert_eq!(
		manager.journal(&b),
		vec![
			Operation::Lock,
			Operation::SendProgram,
			Operation::RunProgram,
			Operation::Unlock,
		]
	);
	assert!(!session.is_connected());
}

#[tokio::test]
async fn test_run_on_node_failure_keeps_lock() {
	let (manager, _, b) = two_nodes();
	let session = start(&manager, SessionOptions::new()).await;
	let node = session.node(&b).unwrap();
	manager.fail(&b, Operation::RunProgram, "vm error");
	let outcome = Outcome::default();

	run_on_node_with(&node, PROGRAM, outcome.callbacks()).await;

	assert_eq!(outcome.successes(), 0);
	assert_eq!(outcome.failures(), vec!["run program failed: vm error".to_string()]);
	assert!(manager.owner(&b).is_some());
	settle(&session).await;
}

#[tokio::test]
async fn test_run_on_busy_node_fails_at_lock() {
	let (manager, a, _) = two_nodes();
	let session = start(&manager, SessionOptions::new()).await;
	manager.take_over(&a);
	let node = session.node(&a).unwrap();

	let err = run_on_node(&node, PROGRAM).await.unwrap_err();
	assert!(err.runtime().is_some_and(|err| err.is_lock_conflict()));
	assert!(manager.journal(&a).is_empty());
}

//! Compiling, running and flashing programs on the selected node.
//!
//! Each operation is a sequence of transport round trips awaited in order;
//! the first failing step aborts the rest. The `*_with` variants route the
//! outcome to [`Callbacks`] instead of returning it.

use tdm_protocol::{NodeStatus, ProgrammingLanguage};
use tracing::{debug, info};

use super::Session;
use crate::error::{Error, Result};
use crate::handlers::Callbacks;
use crate::node::Node;

/// Outcome of a program operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
	/// Every step succeeded.
	Done,
	/// Nothing was sent to the robot.
	Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// No node is selected.
	NotSelected,
	/// The selected node is not `Ready`.
	NotReady(NodeStatus),
}

impl Completion {
	pub fn is_done(self) -> bool {
		matches!(self, Completion::Done)
	}
}

impl Session {
	/// Compiles, loads and starts `program` on the selected node, saving it as
	/// the node's scratch pad.
	///
	/// Fails with [`Error::NotConnected`] when no node is selected. Does
	/// nothing when the selected node is not `Ready`.
	pub async fn run(&self, program: &str) -> Result<Completion> {
		let node = match self.ready_node() {
			Ok(node) => node,
			Err(SkipReason::NotSelected) => return Err(Error::NotConnected),
			Err(reason) => return Ok(self.skip("run", reason)),
		};

		self.push_custom_events(&node).await?;
		node.send_program(program, false).await?;
		node.set_scratch_pad(program, ProgrammingLanguage::Aseba).await?;
		node.run_program().await?;
		info!(node = %node.id(), "program started");
		Ok(Completion::Done)
	}

	/// Compiles `program` on the selected node without loading it.
	///
	/// Does nothing when no node is selected or the node is not `Ready`.
	pub async fn check(&self, program: &str) -> Result<Completion> {
		let node = match self.ready_node() {
			Ok(node) => node,
			Err(reason) => return Ok(self.skip("check", reason)),
		};

		self.push_custom_events(&node).await?;
		node.send_program(program, true).await?;
		debug!(node = %node.id(), "program checked");
		Ok(Completion::Done)
	}

	/// Loads `program` on the selected node and writes it to the robot's
	/// non-volatile memory.
	///
	/// Fails with [`Error::NotConnected`] when no node is selected. Does
	/// nothing when the selected node is not `Ready`.
	pub async fn flash(&self, program: &str) -> Result<Completion> {
		let node = match self.ready_node() {
			Ok(node) => node,
			Err(SkipReason::NotSelected) => return Err(Error::NotConnected),
			Err(reason) => return Ok(self.skip("flash", reason)),
		};

		node.send_program(program, false).await?;
		node.flash_program().await?;
		info!(node = %node.id(), "program flashed");
		Ok(Completion::Done)
	}

	/// [`run`](Self::run), reporting the outcome to `callbacks`.
	pub async fn run_with(&self, program: &str, callbacks: Callbacks) {
		let outcome = self.run(program).await;
		self.complete(outcome, callbacks);
	}

	/// [`check`](Self::check), reporting the outcome to `callbacks`. Without a
	/// selected node neither callback fires.
	pub async fn check_with(&self, program: &str, callbacks: Callbacks) {
		let outcome = self.check(program).await;
		self.complete(outcome, callbacks);
	}

	/// [`flash`](Self::flash), reporting the outcome to `callbacks`.
	pub async fn flash_with(&self, program: &str, callbacks: Callbacks) {
		let outcome = self.flash(program).await;
		self.complete(outcome, callbacks);
	}

	fn ready_node(&self) -> std::result::Result<Node, SkipReason> {
		let node = self.selected_node().ok_or(SkipReason::NotSelected)?;
		match node.status() {
			NodeStatus::Ready => Ok(node),
			status => Err(SkipReason::NotReady(status)),
		}
	}

	fn skip(&self, operation: &'static str, reason: SkipReason) -> Completion {
		debug!(operation, ?reason, "program operation skipped");
		Completion::Skipped(reason)
	}

	async fn push_custom_events(&self, node: &Node) -> Result<()> {
		let events = self.inner.state.lock().custom_events.clone();
		match events {
			Some(events) => node.set_events_descriptions(events).await,
			None => Ok(()),
		}
	}

	fn complete(&self, outcome: Result<Completion>, callbacks: Callbacks) {
		match outcome {
			Ok(Completion::Done) => callbacks.succeed(),
			Ok(Completion::Skipped(_)) => {}
			Err(err) => callbacks.fail(err, self.inner.options.on_failure.as_ref()),
		}
	}
}

/// Locks `node`, loads and starts `program`, then unlocks it.
///
/// Independent of any session selection. A failing step aborts the rest, so
/// the lock stays held if loading or starting fails.
pub async fn run_on_node(node: &Node, program: &str) -> Result<()> {
	node.lock().await?;
	node.send_program(program, false).await?;
	node.run_program().await?;
	node.unlock().await?;
	info!(node = %node.id(), "program run on node");
	Ok(())
}

/// [`run_on_node`], reporting the outcome to `callbacks`. Failures without a
/// call-site handler are logged.
pub async fn run_on_node_with(node: &Node, program: &str, callbacks: Callbacks) {
	match run_on_node(node, program).await {
		Ok(()) => callbacks.succeed(),
		Err(err) => callbacks.fail(err, None),
	}
}

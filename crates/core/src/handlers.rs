//! Application callbacks and failure routing.
//!
//! Session-wide handlers are shared ([`Arc`]) and may fire many times.
//! Per-call [`Callbacks`] fire at most once.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Error;

/// Normalized variables by name, in notification order.
pub type Variables = IndexMap<String, Vec<i32>>;

/// Selection state changed: `true` once a node is locked, `false` when it is lost.
pub type ChangeHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Any node-list update.
pub type NodesHandler = Arc<dyn Fn() + Send + Sync>;

/// One batch of changed variables.
pub type VariablesCallback = Arc<dyn Fn(Variables) + Send + Sync>;

/// One event emitted by the robot: name and normalized payload.
pub type EventCallback = Arc<dyn Fn(&str, Vec<i32>) + Send + Sync>;

/// Session-wide failure sink.
pub type FailureHandler = Arc<dyn Fn(Error) + Send + Sync>;

type SuccessFn = Box<dyn FnOnce() + Send>;
type FailureFn = Box<dyn FnOnce(Error) + Send>;

/// Call-site completion handlers for the routed program operations.
///
/// `on_success` fires only when the operation completed every step;
/// `on_failure` takes precedence over the session-wide failure handler.
#[derive(Default)]
pub struct Callbacks {
	on_success: Option<SuccessFn>,
	on_failure: Option<FailureFn>,
}

impl Callbacks {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_success<F>(mut self, f: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		self.on_success = Some(Box::new(f));
		self
	}

	pub fn on_failure<F>(mut self, f: F) -> Self
	where
		F: FnOnce(Error) + Send + 'static,
	{
		self.on_failure = Some(Box::new(f));
		self
	}

	pub(crate) fn succeed(self) {
		if let Some(f) = self.on_success {
			f();
		}
	}

	/// Routes `error` to exactly one sink: the call-site handler, else
	/// `fallback`, else the error log.
	pub(crate) fn fail(self, error: Error, fallback: Option<&FailureHandler>) {
		match (self.on_failure, fallback) {
			(Some(f), _) => f(error),
			(None, Some(handler)) => handler(error),
			(None, None) => tracing::error!(error = %error, "program operation failed"),
		}
	}
}

impl std::fmt::Debug for Callbacks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Callbacks")
			.field("on_success", &self.on_success.is_some())
			.field("on_failure", &self.on_failure.is_some())
			.finish()
	}
}

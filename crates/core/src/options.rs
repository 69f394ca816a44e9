//! Session options: endpoint, auto-connect target and application callbacks.

use std::sync::Arc;

use tdm_protocol::NodeId;
use tdm_runtime::ClientConfig;

use crate::config::{SessionConfig, VariablesSetting};
use crate::error::Error;
use crate::handlers::{
	ChangeHandler, EventCallback, FailureHandler, NodesHandler, Variables, VariablesCallback,
};

/// Node to select: a specific identity, or the first available node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	Auto,
	Node(NodeId),
}

impl Target {
	/// Literal accepted in place of a node identity to mean [`Target::Auto`].
	pub const AUTO: &'static str = "auto";

	pub fn matches(&self, id: &NodeId) -> bool {
		match self {
			Target::Auto => true,
			Target::Node(target) => target == id,
		}
	}
}

impl From<&str> for Target {
	fn from(value: &str) -> Self {
		if value == Self::AUTO {
			Target::Auto
		} else {
			Target::Node(NodeId::from(value))
		}
	}
}

impl From<String> for Target {
	fn from(value: String) -> Self {
		Target::from(value.as_str())
	}
}

impl From<NodeId> for Target {
	fn from(id: NodeId) -> Self {
		Target::Node(id)
	}
}

impl From<&NodeId> for Target {
	fn from(id: &NodeId) -> Self {
		Target::Node(id.clone())
	}
}

impl std::fmt::Display for Target {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Target::Auto => f.write_str(Self::AUTO),
			Target::Node(id) => write!(f, "{id}"),
		}
	}
}

/// How variable notifications reach the application.
#[derive(Clone)]
pub enum VariablesMode {
	/// Store values only; read them with [`Session::get_variable`](crate::Session::get_variable).
	Auto,
	/// Store values and call the handler once per notification batch.
	Callback(VariablesCallback),
}

impl std::fmt::Debug for VariablesMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			VariablesMode::Auto => f.write_str("Auto"),
			VariablesMode::Callback(_) => f.write_str("Callback"),
		}
	}
}

/// Options for a [`Session`](crate::Session).
///
/// Without a target the session never connects on its own; call
/// [`Session::connect`](crate::Session::connect) explicitly.
#[derive(Clone, Default)]
pub struct SessionOptions {
	pub(crate) client: ClientConfig,
	pub(crate) target: Option<Target>,
	pub(crate) on_change: Option<ChangeHandler>,
	pub(crate) on_any_node_change: Option<NodesHandler>,
	pub(crate) variables: Option<VariablesMode>,
	pub(crate) on_event: Option<EventCallback>,
	pub(crate) on_failure: Option<FailureHandler>,
}

impl SessionOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds options from a config file. Callbacks are added with the builders.
	pub fn from_config(config: SessionConfig) -> Self {
		let mut options = Self::new().with_password(config.password);
		if let Some(url) = config.url {
			options = options.with_url(url);
		}
		if let Some(uuid) = config.uuid {
			options = options.with_target(uuid);
		}
		if let Some(VariablesSetting::Auto) = config.variables {
			options = options.with_auto_variables();
		}
		options
	}

	/// Sets the device manager endpoint.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.client.url = url.into();
		self
	}

	/// Sets the device manager credential.
	pub fn with_password(mut self, password: Option<String>) -> Self {
		self.client = self.client.with_password(password);
		self
	}

	/// Connects automatically to `target` whenever nothing is selected and
	/// the node list changes.
	pub fn with_target(mut self, target: impl Into<Target>) -> Self {
		self.target = Some(target.into());
		self
	}

	pub fn on_change<F>(mut self, f: F) -> Self
	where
		F: Fn(bool) + Send + Sync + 'static,
	{
		self.on_change = Some(Arc::new(f));
		self
	}

	pub fn on_any_node_change<F>(mut self, f: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.on_any_node_change = Some(Arc::new(f));
		self
	}

	pub fn with_variables(mut self, mode: VariablesMode) -> Self {
		self.variables = Some(mode);
		self
	}

	/// Stores variables for [`Session::get_variable`](crate::Session::get_variable)
	/// without calling back.
	pub fn with_auto_variables(self) -> Self {
		self.with_variables(VariablesMode::Auto)
	}

	/// Calls `f` once per batch of changed variables.
	pub fn on_variables<F>(self, f: F) -> Self
	where
		F: Fn(Variables) + Send + Sync + 'static,
	{
		self.with_variables(VariablesMode::Callback(Arc::new(f)))
	}

	/// Calls `f` once per event emitted by the robot.
	pub fn on_event<F>(mut self, f: F) -> Self
	where
		F: Fn(&str, Vec<i32>) + Send + Sync + 'static,
	{
		self.on_event = Some(Arc::new(f));
		self
	}

	/// Receives failures of routed operations that have no call-site handler.
	pub fn on_failure<F>(mut self, f: F) -> Self
	where
		F: Fn(Error) + Send + Sync + 'static,
	{
		self.on_failure = Some(Arc::new(f));
		self
	}

	pub fn client_config(&self) -> &ClientConfig {
		&self.client
	}

	pub fn target(&self) -> Option<&Target> {
		self.target.as_ref()
	}
}

impl std::fmt::Debug for SessionOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionOptions")
			.field("url", &self.client.url)
			.field("password", &self.client.password.as_ref().map(|_| "<redacted>"))
			.field("target", &self.target)
			.field("on_change", &self.on_change.is_some())
			.field("on_any_node_change", &self.on_any_node_change.is_some())
			.field("variables", &self.variables)
			.field("on_event", &self.on_event.is_some())
			.field("on_failure", &self.on_failure.is_some())
			.finish()
	}
}

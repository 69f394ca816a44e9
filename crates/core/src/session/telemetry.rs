//! Variables and events relayed from the selected node.

use std::collections::HashMap;
use std::sync::Arc;

use tdm_protocol::{EventDescription, EventMap, VariableMap, VariableValue};
use tracing::{debug, trace};

use super::{Session, SessionInner};
use crate::error::{Error, Result};
use crate::handlers::Variables;
use crate::node::Node;
use crate::options::VariablesMode;

impl SessionInner {
	/// Installs the variables and events hooks on a newly selected node.
	///
	/// Hooks replace whatever was installed on the node before.
	pub(super) fn attach_telemetry(self: &Arc<Self>, node: &Node) {
		if self.options.variables.is_some() {
			let session = Arc::downgrade(self);
			node.on_variables_changed(Arc::new(move |batch: VariableMap| {
				if let Some(inner) = session.upgrade() {
					inner.route_variables(batch);
				}
			}));
		}

		if self.options.on_event.is_some() {
			let session = Arc::downgrade(self);
			node.on_events(Arc::new(move |batch: EventMap| {
				if let Some(inner) = session.upgrade() {
					inner.route_events(batch);
				}
			}));
		}

		debug!(node = %node.id(), "telemetry attached");
	}

	fn route_variables(&self, batch: VariableMap) {
		let variables: Variables = batch
			.into_iter()
			.map(|(name, value)| (name, value.into_values()))
			.collect();

		{
			let mut state = self.state.lock();
			for (name, values) in &variables {
				state.variables.insert(name.clone(), values.clone());
			}
		}
		trace!(count = variables.len(), "variables changed");

		if let Some(VariablesMode::Callback(f)) = &self.options.variables {
			f(variables);
		}
	}

	fn route_events(&self, batch: EventMap) {
		let Some(on_event) = &self.options.on_event else {
			return;
		};
		for (name, value) in batch {
			trace!(event = %name, "event received");
			on_event(&name, value.into_values());
		}
	}
}

impl Session {
	/// Last value received for a variable of the selected node.
	///
	/// Values are only recorded when a variables mode is configured. They
	/// survive [`close`](Self::close).
	pub fn get_variable(&self, name: &str) -> Option<Vec<i32>> {
		self.inner.state.lock().variables.get(name).cloned()
	}

	/// Snapshot of every variable received so far.
	pub fn variables(&self) -> HashMap<String, Vec<i32>> {
		self.inner.state.lock().variables.clone()
	}

	/// Writes variables on the selected node.
	pub async fn set_variables<I, K, V>(&self, variables: I) -> Result<()>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<VariableValue>,
	{
		let node = self.selected_node().ok_or(Error::NotConnected)?;
		let variables: VariableMap = variables
			.into_iter()
			.map(|(name, value)| (name.into(), value.into()))
			.collect();
		node.set_variables(variables).await
	}

	/// Emits one event on the selected node. A missing value sends an empty
	/// payload.
	pub async fn emit_event(&self, name: &str, value: Option<Vec<i32>>) -> Result<()> {
		let node = self.selected_node().ok_or(Error::NotConnected)?;
		let mut events = EventMap::new();
		events.insert(name.to_string(), VariableValue::Vector(value.unwrap_or_default()));
		node.emit_events(events).await
	}

	/// Declares the custom events used by programs sent afterwards.
	///
	/// The declarations are pushed to the node before each
	/// [`run`](Self::run) and [`check`](Self::check).
	pub fn declare_custom_events(&self, events: Vec<EventDescription>) {
		debug!(count = events.len(), "custom events declared");
		self.inner.state.lock().custom_events = Some(events);
	}

	pub fn custom_events(&self) -> Option<Vec<EventDescription>> {
		self.inner.state.lock().custom_events.clone()
	}
}

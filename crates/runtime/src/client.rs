//! Device manager client boundary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::node::NodeHandle;

/// Handler invoked with the nodes whose state changed.
pub type NodesChangedHandler = Arc<dyn Fn(Vec<NodeHandle>) + Send + Sync>;

/// Handler invoked once the connection to the device manager is closed.
pub type CloseHandler = Arc<dyn Fn() + Send + Sync>;

/// Boxed future resolving to an opened client.
pub type ClientFuture<'a> = Pin<Box<dyn Future<Output = Result<Arc<dyn DeviceManager>>> + Send + 'a>>;

/// An open connection to a device manager.
///
/// # Contract
///
/// Implementations **must**:
/// - Deliver the currently visible nodes to a newly registered
///   nodes-changed handler, then every later change.
/// - Invoke handlers in notification order.
/// - Not invoke handlers while holding locks the handler could need.
pub trait DeviceManager: Send + Sync {
	/// Registers a handler for node-list changes.
	fn on_nodes_changed(&self, handler: NodesChangedHandler);

	/// Registers a handler for the connection closing.
	fn on_close(&self, handler: CloseHandler);
}

/// Opens device manager clients from an endpoint and credential.
pub trait Connector: Send + Sync {
	fn connect<'a>(&'a self, config: &'a ClientConfig) -> ClientFuture<'a>;
}

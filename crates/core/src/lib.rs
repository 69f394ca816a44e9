//! tdm: Session facade for the Thymio Device Manager
//!
//! Tracks the robots (nodes) a device manager exposes, locks one of them for
//! exclusive use, runs programs on it and relays its variables and events.
//!
//! # Examples
//!
//! ## Run a program on the first available robot
//!
//! ```ignore
//! use tdm::{MemoryDeviceManager, NodeStatus, Session, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> tdm::Result<()> {
//!     let manager = MemoryDeviceManager::new();
//!     manager.add_node("{a1}", "thymio-II", NodeStatus::Available);
//!
//!     let options = SessionOptions::new()
//!         .with_target("auto")
//!         .on_change(|connected| println!("connected: {connected}"));
//!     let session = Session::open(&manager, options).await?;
//!     session.flush().await;
//!
//!     if session.can_run() {
//!         session.run("motor.left.target = 200").await?;
//!     }
//!     session.close().await
//! }
//! ```
//!
//! ## Telemetry
//!
//! ```ignore
//! use tdm::{Session, SessionOptions};
//!
//! let options = SessionOptions::new()
//!     .with_target("auto")
//!     .on_variables(|vars| println!("{vars:?}"))
//!     .on_event(|name, value| println!("{name}: {value:?}"));
//! let session = Session::open(&connector, options).await?;
//! let prox = session.get_variable("prox.horizontal");
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod node;
pub mod options;
pub mod registry;
pub mod session;

pub use config::{SessionConfig, VariablesSetting};
pub use error::{Error, Result};
pub use handlers::{
	Callbacks, ChangeHandler, EventCallback, FailureHandler, NodesHandler, Variables,
	VariablesCallback,
};
pub use node::{Node, NodeInfo};
pub use options::{SessionOptions, Target, VariablesMode};
pub use registry::NodeRegistry;
pub use session::{Completion, Session, SkipReason, run_on_node, run_on_node_with};
pub use tdm_protocol::{
	EventDescription, EventMap, NodeId, NodeStatus, ProgrammingLanguage, VariableMap,
	VariableValue,
};
pub use tdm_runtime::{
	ClientConfig, Connector, DEFAULT_URL, DeviceManager, MemoryDeviceManager, Operation,
	RemoteNode,
};

//! Thymio Device Manager runtime - transport boundary
//!
//! This crate defines what the session layer needs from a device manager
//! client, without implementing the device manager wire protocol:
//!
//! - **Client**: Node-list and connection-closed notifications ([`DeviceManager`])
//! - **Connector**: Opening a client from an endpoint and credential ([`Connector`])
//! - **Node**: Per-node asynchronous operations and telemetry hooks ([`RemoteNode`])
//! - **Memory**: An in-process device manager implementing all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │     tdm     │  Session, registry, program runner
//! └──────┬──────┘
//!        │ consumes DeviceManager / RemoteNode
//! ┌──────▼──────┐
//! │ tdm-runtime │  This crate
//! │  ┌────────┐ │
//! │  │ Client │ │  Notifications
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │  Node  │ │  Lock, program, telemetry
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Memory │ │  Simulated device manager
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod node;

pub use client::{ClientFuture, CloseHandler, Connector, DeviceManager, NodesChangedHandler};
pub use config::{ClientConfig, DEFAULT_URL};
pub use error::{Error, Result};
pub use memory::{ClientId, MemoryClient, MemoryDeviceManager, MemoryNode};
pub use node::{EventsHandler, NodeFuture, NodeHandle, Operation, RemoteNode, VariablesHandler};
pub use tdm_protocol::{
	EventDescription, EventMap, NodeId, NodeStatus, ProgrammingLanguage, VariableMap,
	VariableValue,
};

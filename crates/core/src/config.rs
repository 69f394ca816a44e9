//! Session config file.
//!
//! A JSON file carrying the serializable part of
//! [`SessionOptions`](crate::SessionOptions):
//!
//! ```json
//! { "url": "ws://localhost:8597", "password": "…", "uuid": "auto", "variables": "auto" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Variables handling that can be expressed in a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariablesSetting {
	Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
	/// Node identity, or `"auto"` for the first available node.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uuid: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variables: Option<VariablesSetting>,
}

impl SessionConfig {
	/// Reads a config file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
			path: path.to_path_buf(),
			source,
		})
	}
}

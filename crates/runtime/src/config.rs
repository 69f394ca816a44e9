//! Client connection settings.

/// Endpoint of a device manager running on the local machine.
pub const DEFAULT_URL: &str = "ws://localhost:8597";

/// Endpoint and credential used to open a device manager client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	pub url: String,
	pub password: Option<String>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			password: None,
		}
	}
}

impl ClientConfig {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			password: None,
		}
	}

	/// Sets the access credential. An empty string means no credential.
	pub fn with_password(mut self, password: Option<String>) -> Self {
		self.password = password.filter(|p| !p.is_empty());
		self
	}
}

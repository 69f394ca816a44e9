//! Variable and event values.
//!
//! The device manager reports either a single number or a vector of numbers
//! for each variable or event. [`VariableValue`] tags that shape once at the
//! boundary and [`VariableValue::into_values`] flattens it to the uniform
//! array form applications see.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A variable or event payload as reported by the device manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
	/// A single number.
	Scalar(i32),
	/// A vector of numbers.
	Vector(Vec<i32>),
}

impl VariableValue {
	/// Normalizes to the array shape: `Scalar(5)` becomes `[5]`.
	pub fn into_values(self) -> Vec<i32> {
		match self {
			Self::Scalar(value) => vec![value],
			Self::Vector(values) => values,
		}
	}

	/// Returns `true` for the scalar shape.
	pub fn is_scalar(&self) -> bool {
		matches!(self, Self::Scalar(_))
	}
}

impl From<i32> for VariableValue {
	fn from(value: i32) -> Self {
		Self::Scalar(value)
	}
}

impl From<Vec<i32>> for VariableValue {
	fn from(values: Vec<i32>) -> Self {
		Self::Vector(values)
	}
}

impl<const N: usize> From<[i32; N]> for VariableValue {
	fn from(values: [i32; N]) -> Self {
		Self::Vector(values.to_vec())
	}
}

/// Variables by name, in notification order.
pub type VariableMap = IndexMap<String, VariableValue>;

/// Events by name, in notification order.
pub type EventMap = IndexMap<String, VariableValue>;

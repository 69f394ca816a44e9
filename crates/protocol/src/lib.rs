//! Value types for the Thymio Device Manager boundary.
//!
//! This crate holds the data shapes exchanged with the device manager
//! transport: node identities, the node status enumeration, variable and
//! event values, and program metadata.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond conversion and serialization
//! - **Bit-exact**: Numeric encodings match the device manager schema
//! - **Normalized once**: Values are tagged at the boundary so consumers never
//!   inspect shapes at runtime
//!
//! Session semantics are built on top of these types in `tdm`.

pub mod status;
pub mod types;
pub mod value;

pub use status::*;
pub use types::*;
pub use value::*;

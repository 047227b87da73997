//! Push-based streams
//!
//! This module provides the [`Stream`] type, the [`Observable`] trait that
//! carries its composition operators, and the constructors that adapt
//! values, iterables and other streams into streams.

pub mod core;
pub mod constructors;
pub mod operators;
pub mod for_each;

// Re-export core types
pub use self::core::{Observable, Stream};

// Re-export constructors
pub use self::constructors::{from, from_iter, from_json, from_json_str, of, IntoStream};

pub use self::for_each::ForEach;

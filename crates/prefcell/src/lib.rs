#![doc = include_str!("../README.md")]

/// Two-way binding projection of a cell's entry.
pub mod binding;

/// The typed observable cell.
pub mod cell;

/// Cell error types.
pub mod error;

/// Type-safe preference keys.
pub mod key;

pub use binding::Binding;
pub use cell::PrefCell;
pub use error::CellError;
pub use key::Key;

//! Shared error taxonomy and the component registry used across all parlor
//! crates.

pub mod error;
pub mod registry;

pub use {
    error::{Error, Result},
    registry::Registry,
};

//! Shared utilities.

pub mod money;

//! Shared helpers.

pub mod category;

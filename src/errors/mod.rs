//! Error types for boardxfer

pub mod types;

pub use types::*;

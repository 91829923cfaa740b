//! Utility functions and helpers used throughout boardxfer

pub mod logging;

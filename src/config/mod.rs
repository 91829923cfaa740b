//! Configuration management for boardxfer

pub mod app_config;
pub mod board_config;

pub use app_config::*;
pub use board_config::*;

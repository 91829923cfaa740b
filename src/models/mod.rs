//! Data models shared by the transfer engines, the coordinator and the server

pub mod profile;
pub mod responses;
pub mod transfer;

pub use profile::*;
pub use responses::*;
pub use transfer::*;

//! Security modules for boardxfer
//!
//! Input sanitization for everything a client can put into a generated
//! command, an FTP verb or a filesystem path.

pub mod filename_validator;

// Re-export commonly used security functions
pub use filename_validator::FilenameValidator;

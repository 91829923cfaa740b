//! Transfer services shared by the HTTP server and the command line
//!
//! Both front ends go through [`TransferCoordinator`] so that locking,
//! archiving and error reporting behave the same everywhere.

pub mod archive;
pub mod board_registry;
pub mod coordinator;
pub mod network_transfer;
pub mod port_locks;
pub mod repl_protocol;
pub mod serial_repl;
pub mod transport_tester;

pub use archive::{ArchiveEntry, ArchiveStore, StoredArchive};
pub use board_registry::BoardRegistry;
pub use coordinator::{TransferCoordinator, Transports};
pub use network_transfer::NetworkTransferEngine;
pub use port_locks::PortLocks;
pub use serial_repl::{SerialReplDriver, SerialSession};
pub use transport_tester::TransportTester;

//! boardxfer - move files to and from MicroPython boards
//!
//! Binary entry point for the operator command line tool.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    boardxfer::cli::run().await
}

//! Activation key recovery.
//!
//! AAX files are encrypted with a key derived from the account's activation
//! bytes. The file checksum can be reversed into those bytes with a set of
//! rainbow tables, tried one after the other by the `rcrack` tool.

mod config;
mod error;
mod recovery;
mod tables;
mod traits;

pub use config::TablesConfig;
pub use error::{KeyRecoveryError, TableError};
pub use recovery::KeyRecovery;
pub use tables::{discover_tables, LookupTable};
pub use traits::ProgressSink;

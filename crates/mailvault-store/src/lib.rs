//! # mailvault-store
//!
//! Git-backed encrypted mailbox for contact-form submissions.
//!
//! Every message is sealed with AES-256-GCM, written to a deterministic
//! date-partitioned path and committed with the `git` executable, which
//! serves as both the write log and the replication channel. The
//! repository can therefore be mirrored to an untrusted remote: without the
//! key it holds only ciphertext.

pub mod config;
pub mod events;
pub mod git;
pub mod layout;
pub mod store;

mod error;

pub use config::StorageConfig;
pub use error::{Result, StoreError};
pub use events::{EventSink, MemorySink, SharedSink};
pub use layout::MessageLayout;
pub use store::MessageStore;

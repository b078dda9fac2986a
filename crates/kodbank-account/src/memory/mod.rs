//! In-memory collaborators.
//!
//! [`MemoryAuthProvider`] and [`MemoryRecordStore`] implement the collaborator
//! traits in-process. They are suitable for tests and the CLI `demo` command;
//! all state is lost when they are dropped.

mod provider;
mod store;

pub use provider::MemoryAuthProvider;
pub use store::MemoryRecordStore;

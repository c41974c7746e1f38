//! Core traits and types for document tree providers.
//!
//! A document tree is reachable only from an opaque root capability and is
//! addressed by name lookup, one segment at a time. This crate defines:
//! - `DocumentProvider`: the blocking API a tree runtime offers
//! - `DocumentNode`: an attribute snapshot of one tree entry
//! - `RootCapability`: the persistable grant naming one subtree
//! - `MemoryProvider`: an in-process tree, used by tests and embedders

mod capability;
mod error;
mod memory;
mod node;
mod provider;

pub use capability::RootCapability;
pub use error::ProviderError;
pub use memory::MemoryProvider;
pub use node::{DocumentNode, NodeKind, WriteMode};
pub use provider::{DocumentProvider, InputChannel, OutputChannel, GENERIC_MIME_TYPE};

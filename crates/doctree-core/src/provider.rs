use std::io::{Read, Write};

use crate::capability::RootCapability;
use crate::error::ProviderError;
use crate::node::{DocumentNode, WriteMode};

/// Content type hint used when a file is created without a known type.
pub const GENERIC_MIME_TYPE: &str = "*/*";

/// Raw byte channel returned by `open_input`.
pub type InputChannel = Box<dyn Read + Send>;

/// Raw byte channel returned by `open_output`.
pub type OutputChannel = Box<dyn Write + Send>;

/// Blocking API of a document tree runtime.
///
/// Every call may block for the duration of the underlying storage I/O.
/// Implementations must be safe to call from many threads at once but give
/// no isolation between concurrent callers: a delete racing a create on the
/// same name may interleave arbitrarily.
pub trait DocumentProvider: Send + Sync {
    /// Resolve a capability to the root node of its subtree.
    fn resolve_root(&self, capability: &RootCapability) -> Result<DocumentNode, ProviderError>;

    /// Look up a direct child of `parent` by display name.
    fn find_child(
        &self,
        parent: &DocumentNode,
        name: &str,
    ) -> Result<Option<DocumentNode>, ProviderError>;

    /// List the direct children of `parent`.
    fn list_children(&self, parent: &DocumentNode) -> Result<Vec<DocumentNode>, ProviderError>;

    /// Create a child directory named `name` under `parent`.
    fn create_directory(
        &self,
        parent: &DocumentNode,
        name: &str,
    ) -> Result<DocumentNode, ProviderError>;

    /// Create an empty child file named `name` under `parent`.
    ///
    /// `mime_type` is a hint; providers are free to ignore it.
    fn create_file(
        &self,
        parent: &DocumentNode,
        mime_type: &str,
        name: &str,
    ) -> Result<DocumentNode, ProviderError>;

    /// Delete `node` (recursively for directories).
    ///
    /// Returns `false` if the provider declined without an error.
    fn delete(&self, node: &DocumentNode) -> Result<bool, ProviderError>;

    /// Rename `node` within its current parent.
    ///
    /// Returns `false` if the provider declined, e.g. a sibling already
    /// carries `new_name`.
    fn rename(&self, node: &DocumentNode, new_name: &str) -> Result<bool, ProviderError>;

    /// Open a sequential reader over the content of `node`.
    fn open_input(&self, node: &DocumentNode) -> Result<InputChannel, ProviderError>;

    /// Open a sequential writer over the content of `node`.
    fn open_output(
        &self,
        node: &DocumentNode,
        mode: WriteMode,
    ) -> Result<OutputChannel, ProviderError>;
}

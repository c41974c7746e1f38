use chrono::{DateTime, Utc};

/// Kind of a document tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// How an output channel treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Discard existing content before writing
    Truncate,
    /// Keep existing content and write after it
    Append,
}

/// Snapshot of one document tree entry, taken when it was looked up.
///
/// Nodes are not identities: a provider-side change after the lookup is not
/// reflected here, and the handle may stop working altogether.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    /// Provider handle (content URI, host path, ...)
    pub uri: String,
    /// Display name within the parent
    pub name: String,
    pub kind: NodeKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Provider modification time, if known
    pub modified: Option<DateTime<Utc>>,
    pub can_read: bool,
    pub can_write: bool,
}

impl DocumentNode {
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

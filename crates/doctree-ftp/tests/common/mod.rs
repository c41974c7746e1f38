#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use doctree_core::{DocumentNode, DocumentProvider, MemoryProvider, RootCapability, WriteMode};
use doctree_ftp::{FileSystemFactory, FileSystemView, SessionUser};
use doctree_local::LocalProvider;
use tempfile::TempDir;

/// In-memory tree used by most tests:
///
/// ```text
/// /
/// ├── docs/
/// │   └── a.txt   ("test")
/// └── other/
/// ```
pub struct Scenario {
    pub provider: Arc<MemoryProvider>,
    pub capability: RootCapability,
    pub root: DocumentNode,
    pub docs: DocumentNode,
    pub other: DocumentNode,
}

impl Scenario {
    pub fn new() -> Self {
        let provider = Arc::new(MemoryProvider::new());
        let capability = provider.grant_root().unwrap();
        let root = provider.resolve_root(&capability).unwrap();
        let docs = provider.create_directory(&root, "docs").unwrap();
        let other = provider.create_directory(&root, "other").unwrap();
        write_node(&provider, &docs, "a.txt", b"test");
        Self {
            provider,
            capability,
            root,
            docs,
            other,
        }
    }

    pub fn view(&self) -> FileSystemView {
        self.view_as("alice")
    }

    pub fn view_as(&self, user: &str) -> FileSystemView {
        FileSystemFactory::new(self.provider.clone(), self.capability.clone())
            .create_view(SessionUser::new(user))
    }

    /// Fresh lookup of `name` under `parent`, bypassing the adapter.
    pub fn child(&self, parent: &DocumentNode, name: &str) -> Option<DocumentNode> {
        self.provider.find_child(parent, name).unwrap()
    }
}

pub fn write_node(provider: &MemoryProvider, parent: &DocumentNode, name: &str, data: &[u8]) {
    let node = provider.create_file(parent, "text/plain", name).unwrap();
    provider
        .open_output(&node, WriteMode::Truncate)
        .unwrap()
        .write_all(data)
        .unwrap();
}

/// View over an empty in-memory tree.
pub fn memory_view() -> FileSystemView {
    let provider = Arc::new(MemoryProvider::new());
    let capability = provider.grant_root().unwrap();
    FileSystemView::new(provider, capability, SessionUser::anonymous())
}

/// View over an empty granted temp directory. Keep the `TempDir` alive.
pub fn local_view() -> (FileSystemView, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(LocalProvider::in_memory());
    let capability = provider.grant(temp_dir.path()).unwrap();
    (
        FileSystemView::new(provider, capability, SessionUser::anonymous()),
        temp_dir,
    )
}

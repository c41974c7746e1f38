//! In-process document tree.
//!
//! Mirrors the behaviour of a real document provider closely enough for the
//! adapter to be exercised without one: entries are addressed by name only,
//! capabilities are issued and revoked explicitly, and per-entry read/write
//! grants are enforced on every call.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::capability::RootCapability;
use crate::error::ProviderError;
use crate::node::{DocumentNode, NodeKind, WriteMode};
use crate::provider::{DocumentProvider, InputChannel, OutputChannel};

const SCHEME: &str = "memory";
const URI_PREFIX: &str = "memory://node/";
const ROOT_ID: u64 = 0;

#[derive(Debug)]
struct Entry {
    name: String,
    kind: NodeKind,
    parent: Option<u64>,
    children: BTreeMap<String, u64>,
    content: Vec<u8>,
    modified: DateTime<Utc>,
    can_read: bool,
    can_write: bool,
}

impl Entry {
    fn new(name: &str, kind: NodeKind, parent: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            parent,
            children: BTreeMap::new(),
            content: Vec::new(),
            modified: Utc::now(),
            can_read: true,
            can_write: true,
        }
    }
}

#[derive(Debug)]
struct Tree {
    entries: HashMap<u64, Entry>,
    /// token -> entry id
    grants: HashMap<String, u64>,
    next_id: u64,
}

impl Tree {
    fn entry(&self, id: u64) -> Result<&Entry, ProviderError> {
        self.entries
            .get(&id)
            .ok_or_else(|| ProviderError::NotFound(node_uri(id)))
    }

    fn entry_mut(&mut self, id: u64) -> Result<&mut Entry, ProviderError> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| ProviderError::NotFound(node_uri(id)))
    }

    fn snapshot(&self, id: u64) -> Result<DocumentNode, ProviderError> {
        let entry = self.entry(id)?;
        Ok(DocumentNode {
            uri: node_uri(id),
            name: entry.name.clone(),
            kind: entry.kind,
            size: match entry.kind {
                NodeKind::File => entry.content.len() as u64,
                NodeKind::Directory => 0,
            },
            modified: Some(entry.modified),
            can_read: entry.can_read,
            can_write: entry.can_write,
        })
    }

    fn writable_directory(&self, id: u64) -> Result<&Entry, ProviderError> {
        let entry = self.entry(id)?;
        if entry.kind != NodeKind::Directory {
            return Err(ProviderError::NotADirectory(node_uri(id)));
        }
        if !entry.can_write {
            return Err(ProviderError::PermissionDenied(node_uri(id)));
        }
        Ok(entry)
    }

    fn insert_child(
        &mut self,
        parent: u64,
        name: &str,
        kind: NodeKind,
    ) -> Result<u64, ProviderError> {
        validate_name(name)?;
        if self.writable_directory(parent)?.children.contains_key(name) {
            return Err(ProviderError::AlreadyExists(name.to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, Entry::new(name, kind, Some(parent)));

        let parent_entry = self.entry_mut(parent)?;
        parent_entry.children.insert(name.to_string(), id);
        parent_entry.modified = Utc::now();
        Ok(id)
    }

    fn remove_subtree(&mut self, id: u64) {
        if let Some(entry) = self.entries.remove(&id) {
            for child in entry.children.into_values() {
                self.remove_subtree(child);
            }
        }
    }
}

/// Thread-safe in-memory document tree.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    tree: Arc<Mutex<Tree>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Create an empty tree holding only a writable root directory.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(ROOT_ID, Entry::new("", NodeKind::Directory, None));
        Self {
            tree: Arc::new(Mutex::new(Tree {
                entries,
                grants: HashMap::new(),
                next_id: ROOT_ID + 1,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tree>, ProviderError> {
        self.tree
            .lock()
            .map_err(|_| ProviderError::Provider("memory tree poisoned".to_string()))
    }

    /// Issue a capability for the whole tree.
    pub fn grant_root(&self) -> Result<RootCapability, ProviderError> {
        self.grant_id(ROOT_ID)
    }

    /// Issue a capability for the subtree rooted at `node`.
    pub fn grant(&self, node: &DocumentNode) -> Result<RootCapability, ProviderError> {
        self.grant_id(parse_uri(&node.uri)?)
    }

    fn grant_id(&self, id: u64) -> Result<RootCapability, ProviderError> {
        let mut tree = self.lock()?;
        if tree.entry(id)?.kind != NodeKind::Directory {
            return Err(ProviderError::NotADirectory(node_uri(id)));
        }
        let capability = RootCapability::generate(SCHEME);
        tree.grants.insert(capability.token.clone(), id);
        debug!("Granted {} on {}", capability, node_uri(id));
        Ok(capability)
    }

    /// Withdraw a capability. Returns `false` if it was not granted.
    pub fn revoke(&self, capability: &RootCapability) -> Result<bool, ProviderError> {
        let mut tree = self.lock()?;
        Ok(tree.grants.remove(&capability.token).is_some())
    }

    /// Change the read/write grants of a single entry.
    pub fn set_permissions(
        &self,
        node: &DocumentNode,
        can_read: bool,
        can_write: bool,
    ) -> Result<(), ProviderError> {
        let id = parse_uri(&node.uri)?;
        let mut tree = self.lock()?;
        let entry = tree.entry_mut(id)?;
        entry.can_read = can_read;
        entry.can_write = can_write;
        Ok(())
    }
}

impl DocumentProvider for MemoryProvider {
    fn resolve_root(&self, capability: &RootCapability) -> Result<DocumentNode, ProviderError> {
        if capability.provider != SCHEME {
            return Err(ProviderError::NotGranted(capability.to_string()));
        }
        let tree = self.lock()?;
        let id = *tree
            .grants
            .get(&capability.token)
            .ok_or_else(|| ProviderError::NotGranted(capability.to_string()))?;
        tree.snapshot(id)
    }

    fn find_child(
        &self,
        parent: &DocumentNode,
        name: &str,
    ) -> Result<Option<DocumentNode>, ProviderError> {
        let id = parse_uri(&parent.uri)?;
        let tree = self.lock()?;
        match tree.entry(id)?.children.get(name) {
            Some(child) => Ok(Some(tree.snapshot(*child)?)),
            None => Ok(None),
        }
    }

    fn list_children(&self, parent: &DocumentNode) -> Result<Vec<DocumentNode>, ProviderError> {
        let id = parse_uri(&parent.uri)?;
        let tree = self.lock()?;
        let entry = tree.entry(id)?;
        if entry.kind != NodeKind::Directory {
            return Err(ProviderError::NotADirectory(parent.uri.clone()));
        }
        entry
            .children
            .values()
            .map(|child| tree.snapshot(*child))
            .collect()
    }

    #[instrument(skip(self, parent), level = "debug", fields(parent = %parent.uri))]
    fn create_directory(
        &self,
        parent: &DocumentNode,
        name: &str,
    ) -> Result<DocumentNode, ProviderError> {
        let parent_id = parse_uri(&parent.uri)?;
        let mut tree = self.lock()?;
        let id = tree.insert_child(parent_id, name, NodeKind::Directory)?;
        tree.snapshot(id)
    }

    #[instrument(skip(self, parent), level = "debug", fields(parent = %parent.uri))]
    fn create_file(
        &self,
        parent: &DocumentNode,
        _mime_type: &str,
        name: &str,
    ) -> Result<DocumentNode, ProviderError> {
        let parent_id = parse_uri(&parent.uri)?;
        let mut tree = self.lock()?;
        let id = tree.insert_child(parent_id, name, NodeKind::File)?;
        tree.snapshot(id)
    }

    #[instrument(skip(self, node), level = "debug", fields(uri = %node.uri))]
    fn delete(&self, node: &DocumentNode) -> Result<bool, ProviderError> {
        let id = parse_uri(&node.uri)?;
        let mut tree = self.lock()?;
        let entry = tree.entry(id)?;
        if !entry.can_write {
            return Err(ProviderError::PermissionDenied(node.uri.clone()));
        }
        let Some(parent) = entry.parent else {
            return Ok(false);
        };
        let name = entry.name.clone();

        let parent_entry = tree.entry_mut(parent)?;
        parent_entry.children.remove(&name);
        parent_entry.modified = Utc::now();
        tree.remove_subtree(id);
        Ok(true)
    }

    #[instrument(skip(self, node), level = "debug", fields(uri = %node.uri))]
    fn rename(&self, node: &DocumentNode, new_name: &str) -> Result<bool, ProviderError> {
        validate_name(new_name)?;
        let id = parse_uri(&node.uri)?;
        let mut tree = self.lock()?;
        let entry = tree.entry(id)?;
        if !entry.can_write {
            return Err(ProviderError::PermissionDenied(node.uri.clone()));
        }
        if entry.name == new_name {
            return Ok(true);
        }
        let Some(parent) = entry.parent else {
            return Ok(false);
        };
        let old_name = entry.name.clone();

        let parent_entry = tree.entry_mut(parent)?;
        if parent_entry.children.contains_key(new_name) {
            return Ok(false);
        }
        parent_entry.children.remove(&old_name);
        parent_entry.children.insert(new_name.to_string(), id);

        let entry = tree.entry_mut(id)?;
        entry.name = new_name.to_string();
        entry.modified = Utc::now();
        Ok(true)
    }

    fn open_input(&self, node: &DocumentNode) -> Result<InputChannel, ProviderError> {
        let id = parse_uri(&node.uri)?;
        let tree = self.lock()?;
        let entry = tree.entry(id)?;
        if entry.kind != NodeKind::File {
            return Err(ProviderError::Provider(format!(
                "cannot open directory {} for reading",
                node.uri
            )));
        }
        if !entry.can_read {
            return Err(ProviderError::PermissionDenied(node.uri.clone()));
        }
        Ok(Box::new(Cursor::new(entry.content.clone())))
    }

    fn open_output(
        &self,
        node: &DocumentNode,
        mode: WriteMode,
    ) -> Result<OutputChannel, ProviderError> {
        let id = parse_uri(&node.uri)?;
        let mut tree = self.lock()?;
        let entry = tree.entry_mut(id)?;
        if entry.kind != NodeKind::File {
            return Err(ProviderError::Provider(format!(
                "cannot open directory {} for writing",
                node.uri
            )));
        }
        if !entry.can_write {
            return Err(ProviderError::PermissionDenied(node.uri.clone()));
        }
        if mode == WriteMode::Truncate {
            entry.content.clear();
            entry.modified = Utc::now();
        }
        Ok(Box::new(MemoryWriter {
            tree: Arc::clone(&self.tree),
            id,
        }))
    }
}

/// Writes straight into the entry's content on every call.
struct MemoryWriter {
    tree: Arc<Mutex<Tree>>,
    id: u64,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut tree = self
            .tree
            .lock()
            .map_err(|_| io::Error::other("memory tree poisoned"))?;
        let entry = tree.entries.get_mut(&self.id).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "document deleted while open")
        })?;
        entry.content.extend_from_slice(buf);
        entry.modified = Utc::now();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn node_uri(id: u64) -> String {
    format!("{}{}", URI_PREFIX, id)
}

fn parse_uri(uri: &str) -> Result<u64, ProviderError> {
    uri.strip_prefix(URI_PREFIX)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| ProviderError::NotFound(uri.to_string()))
}

fn validate_name(name: &str) -> Result<(), ProviderError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(ProviderError::InvalidName(name.to_string()));
    }
    Ok(())
}

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use doctree_core::{
    DocumentNode, DocumentProvider, InputChannel, NodeKind, OutputChannel, ProviderError,
    RootCapability, WriteMode,
};
use strict_path::PathBoundary;
use tracing::{debug, instrument};

use crate::grants::GrantStore;

/// Capability scheme issued by this provider.
pub const SCHEME: &str = "local";

/// Document provider over granted host directories.
///
/// Node URIs are canonical host paths. Lookups take one plain entry name at a
/// time and prove the result against a boundary at the parent directory, so
/// a walk can never leave the granted directory through `..` or symlinks.
#[derive(Debug)]
pub struct LocalProvider {
    grants: GrantStore,
}

impl LocalProvider {
    /// Provider whose grants are persisted in `grants_file`.
    pub fn open(grants_file: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        Ok(Self {
            grants: GrantStore::open(grants_file)?,
        })
    }

    /// Provider whose grants are forgotten on drop.
    pub fn in_memory() -> Self {
        Self {
            grants: GrantStore::in_memory(),
        }
    }

    pub fn grant(&self, dir: &Path) -> Result<RootCapability, ProviderError> {
        self.grants.insert(dir)
    }

    pub fn revoke(&self, capability: &RootCapability) -> Result<bool, ProviderError> {
        self.grants.remove(capability)
    }

    pub fn grants(&self) -> Result<Vec<(RootCapability, PathBuf)>, ProviderError> {
        self.grants.list()
    }
}

impl DocumentProvider for LocalProvider {
    #[instrument(skip(self, capability), level = "debug", fields(capability = %capability))]
    fn resolve_root(&self, capability: &RootCapability) -> Result<DocumentNode, ProviderError> {
        if capability.provider != SCHEME {
            return Err(ProviderError::NotGranted(capability.to_string()));
        }
        let dir = self
            .grants
            .get(&capability.token)?
            .ok_or_else(|| ProviderError::NotGranted(capability.to_string()))?;

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let node = node_from_path(&dir, name)?;
        if !node.is_directory() {
            return Err(ProviderError::NotADirectory(node.uri));
        }
        Ok(node)
    }

    fn find_child(
        &self,
        parent: &DocumentNode,
        name: &str,
    ) -> Result<Option<DocumentNode>, ProviderError> {
        if !parent.is_directory() || !is_plain_name(name) {
            return Ok(None);
        }
        let boundary = boundary(parent)?;
        let Some(path) = confine(&boundary, name) else {
            return Ok(None);
        };
        match node_from_path(&path, name.to_string()) {
            Ok(node) => Ok(Some(node)),
            Err(ProviderError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_children(&self, parent: &DocumentNode) -> Result<Vec<DocumentNode>, ProviderError> {
        if !parent.is_directory() {
            return Err(ProviderError::NotADirectory(parent.uri.clone()));
        }
        let boundary = boundary(parent)?;

        let mut children = Vec::new();
        for entry in fs::read_dir(&parent.uri)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(path) = confine(&boundary, &name) else {
                continue;
            };
            // Entries can vanish between read_dir and stat
            match node_from_path(&path, name) {
                Ok(node) => children.push(node),
                Err(_) => continue,
            }
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("Listed {} entries in {}", children.len(), parent.uri);
        Ok(children)
    }

    #[instrument(skip(self, parent), level = "debug", fields(parent = %parent.uri))]
    fn create_directory(
        &self,
        parent: &DocumentNode,
        name: &str,
    ) -> Result<DocumentNode, ProviderError> {
        let path = child_path(parent, name)?;
        fs::create_dir(&path).map_err(|e| map_create_error(e, &path))?;
        node_from_path(&path, name.to_string())
    }

    #[instrument(skip(self, parent), level = "debug", fields(parent = %parent.uri))]
    fn create_file(
        &self,
        parent: &DocumentNode,
        _mime_type: &str,
        name: &str,
    ) -> Result<DocumentNode, ProviderError> {
        let path = child_path(parent, name)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| map_create_error(e, &path))?;
        node_from_path(&path, name.to_string())
    }

    #[instrument(skip(self, node), level = "debug", fields(uri = %node.uri))]
    fn delete(&self, node: &DocumentNode) -> Result<bool, ProviderError> {
        let path = Path::new(&node.uri);
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(true)
    }

    #[instrument(skip(self, node), level = "debug", fields(uri = %node.uri))]
    fn rename(&self, node: &DocumentNode, new_name: &str) -> Result<bool, ProviderError> {
        if !is_plain_name(new_name) {
            return Err(ProviderError::InvalidName(new_name.to_string()));
        }
        let from = Path::new(&node.uri);
        let Some(parent) = from.parent() else {
            return Ok(false);
        };
        let to = parent.join(new_name);
        if to == from {
            return Ok(true);
        }
        if fs::symlink_metadata(&to).is_ok() {
            return Ok(false);
        }
        fs::rename(from, &to)?;
        Ok(true)
    }

    fn open_input(&self, node: &DocumentNode) -> Result<InputChannel, ProviderError> {
        Ok(Box::new(File::open(&node.uri)?))
    }

    fn open_output(
        &self,
        node: &DocumentNode,
        mode: WriteMode,
    ) -> Result<OutputChannel, ProviderError> {
        let mut options = OpenOptions::new();
        match mode {
            WriteMode::Append => options.append(true),
            WriteMode::Truncate => options.write(true).truncate(true),
        };
        Ok(Box::new(options.open(&node.uri)?))
    }
}

/// A single path component that names an entry of its parent.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
}

/// Boundary anchored at a directory node. Every child path is proven
/// against it, so a node never lies outside the directory it was found in.
fn boundary(parent: &DocumentNode) -> Result<PathBoundary, ProviderError> {
    PathBoundary::try_new(&parent.uri)
        .map_err(|e| ProviderError::Provider(format!("{}: {}", parent.uri, e)))
}

/// Host path of `name` inside `boundary`, with symlinks resolved.
///
/// `None` when the entry leads outside the boundary, e.g. through a symlink.
fn confine(boundary: &PathBoundary, name: &str) -> Option<PathBuf> {
    match boundary.strict_join(name) {
        Ok(path) => Some(path.unstrict()),
        Err(e) => {
            debug!(name, error = %e, "Entry leads outside its directory");
            None
        }
    }
}

fn child_path(parent: &DocumentNode, name: &str) -> Result<PathBuf, ProviderError> {
    if !parent.is_directory() {
        return Err(ProviderError::NotADirectory(parent.uri.clone()));
    }
    if !is_plain_name(name) {
        return Err(ProviderError::InvalidName(name.to_string()));
    }
    confine(&boundary(parent)?, name).ok_or_else(|| ProviderError::InvalidName(name.to_string()))
}

fn map_create_error(e: std::io::Error, path: &Path) -> ProviderError {
    if e.kind() == ErrorKind::AlreadyExists {
        ProviderError::AlreadyExists(path.display().to_string())
    } else {
        ProviderError::Io(e)
    }
}

fn node_from_path(path: &Path, name: String) -> Result<DocumentNode, ProviderError> {
    let metadata = fs::metadata(path)?;
    Ok(node_from_metadata(path, name, &metadata))
}

fn node_from_metadata(path: &Path, name: String, metadata: &Metadata) -> DocumentNode {
    let kind = if metadata.is_dir() {
        NodeKind::Directory
    } else {
        NodeKind::File
    };
    DocumentNode {
        uri: path.to_string_lossy().to_string(),
        name,
        kind,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        can_read: is_readable(path, metadata),
        can_write: !metadata.permissions().readonly(),
    }
}

/// Whether the current process can actually open the entry for reading.
fn is_readable(path: &Path, metadata: &Metadata) -> bool {
    if metadata.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        File::open(path).is_ok()
    }
}

use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use doctree_core::DocumentNode;
use tracing::{debug, instrument, warn};

use crate::error::FsError;
use crate::path::CanonicalPath;
use crate::resolver::NodeResolver;
use crate::user::SessionUser;

/// Link count reported for directories.
const DIRECTORY_LINK_COUNT: u32 = 3;

/// One protocol-level path, resolved lazily against the document tree.
///
/// A value lives for a single protocol call. The node and its parent are
/// looked up at most once, on first use, and never refreshed: a mutation made
/// through this value (or by anyone else) is only visible through a new one.
/// Every query tolerates a missing node and answers conservatively.
#[derive(Debug)]
pub struct VirtualFile {
    path: CanonicalPath,
    resolver: Arc<NodeResolver>,
    user: Arc<SessionUser>,
    node: OnceCell<Option<DocumentNode>>,
    parent: OnceCell<Option<DocumentNode>>,
}

impl VirtualFile {
    pub(crate) fn new(
        path: CanonicalPath,
        resolver: Arc<NodeResolver>,
        user: Arc<SessionUser>,
    ) -> Self {
        Self {
            path,
            resolver,
            user,
            node: OnceCell::new(),
            parent: OnceCell::new(),
        }
    }

    /// Value whose node and parent are already known from a listing.
    fn listed(
        path: CanonicalPath,
        resolver: Arc<NodeResolver>,
        user: Arc<SessionUser>,
        node: DocumentNode,
        parent: DocumentNode,
    ) -> Self {
        Self {
            path,
            resolver,
            user,
            node: OnceCell::from(Some(node)),
            parent: OnceCell::from(Some(parent)),
        }
    }

    pub(crate) fn node(&self) -> Option<&DocumentNode> {
        self.node
            .get_or_init(|| self.resolver.resolve(&self.path))
            .as_ref()
    }

    pub(crate) fn parent_node(&self) -> Option<&DocumentNode> {
        self.parent
            .get_or_init(|| self.resolver.resolve_parent(&self.path))
            .as_ref()
    }

    pub(crate) fn resolver(&self) -> &NodeResolver {
        &self.resolver
    }

    pub fn path(&self) -> &CanonicalPath {
        &self.path
    }

    pub fn absolute_path(&self) -> &str {
        self.path.as_str()
    }

    /// Entry name: the provider's display name when resolved, else the last
    /// path segment. The root is always `/`.
    pub fn name(&self) -> &str {
        if self.path.is_root() {
            return "/";
        }
        self.node()
            .map(|n| n.name.as_str())
            .or_else(|| self.path.file_name())
            .unwrap_or("/")
    }

    pub fn is_hidden(&self) -> bool {
        self.node().is_some_and(|n| n.name.starts_with('.'))
    }

    pub fn exists(&self) -> bool {
        self.node().is_some()
    }

    pub fn is_directory(&self) -> bool {
        self.node().is_some_and(DocumentNode::is_directory)
    }

    pub fn is_file(&self) -> bool {
        self.node().is_some_and(DocumentNode::is_file)
    }

    /// Byte length; 0 for directories and missing paths.
    pub fn size(&self) -> u64 {
        match self.node() {
            Some(node) if node.is_file() => node.size,
            _ => 0,
        }
    }

    /// Provider timestamp, or the Unix epoch when unknown.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.node()
            .and_then(|n| n.modified)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Document trees expose no mutable timestamps; always `false`.
    pub fn set_last_modified(&self, _time: DateTime<Utc>) -> bool {
        debug!(path = %self.path, "{}", FsError::Unsupported("setting modification time"));
        false
    }

    /// The node's own read grant, or the parent's when the node is missing.
    pub fn is_readable(&self) -> bool {
        match self.node() {
            Some(node) => node.can_read,
            None => self.parent_node().is_some_and(|p| p.can_read),
        }
    }

    /// The node's own write grant, or the parent's when the node is missing.
    ///
    /// A path that does not exist yet is writable exactly when its parent
    /// accepts new children, which is what lets uploads create files.
    pub fn is_writable(&self) -> bool {
        match self.node() {
            Some(node) => node.can_write,
            None => self.parent_node().is_some_and(|p| p.can_write),
        }
    }

    pub fn is_removable(&self) -> bool {
        self.is_writable()
    }

    pub fn owner_name(&self) -> &str {
        self.user.name()
    }

    pub fn group_name(&self) -> &str {
        self.user.name()
    }

    /// Nominal hard-link count: 3 for directories, 1 otherwise.
    pub fn link_count(&self) -> u32 {
        if self.is_directory() {
            DIRECTORY_LINK_COUNT
        } else {
            1
        }
    }

    /// Provider handle of the resolved node.
    pub fn physical_file(&self) -> Option<&str> {
        self.node().map(|n| n.uri.as_str())
    }

    /// Create this path as a directory inside its existing parent.
    #[instrument(skip(self), level = "debug", fields(path = %self.path))]
    pub fn mkdir(&self) -> bool {
        self.outcome("mkdir", self.try_mkdir()).is_some()
    }

    fn try_mkdir(&self) -> Result<(), FsError> {
        if self.exists() {
            return Err(FsError::AlreadyExists(self.path.clone()));
        }
        if !self.is_writable() {
            return Err(FsError::PermissionDenied(self.path.clone()));
        }
        let (parent, name) = self.creation_target()?;
        self.resolver.provider().create_directory(parent, name)?;
        Ok(())
    }

    /// Delete the resolved node (recursively for directories). The root is
    /// never deleted.
    #[instrument(skip(self), level = "debug", fields(path = %self.path))]
    pub fn delete(&self) -> bool {
        self.outcome("delete", self.try_delete()).is_some()
    }

    fn try_delete(&self) -> Result<(), FsError> {
        if self.path.is_root() {
            return Err(FsError::Unsupported("deleting the root"));
        }
        let node = self
            .node()
            .ok_or_else(|| FsError::NotFound(self.path.clone()))?;
        if !self.is_writable() {
            return Err(FsError::PermissionDenied(self.path.clone()));
        }
        if !self.resolver.provider().delete(node)? {
            return Err(FsError::Declined {
                op: "delete",
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Rename this entry to the last segment of `destination`.
    ///
    /// The provider can only rename within the current parent. When
    /// `destination` lives in another directory the entry is still renamed in
    /// place, under the destination's name; nothing is copied across.
    #[instrument(skip(self, destination), level = "debug", fields(from = %self.path, to = %destination.path))]
    pub fn move_to(&self, destination: &VirtualFile) -> bool {
        self.outcome("move", self.try_move(destination)).is_some()
    }

    fn try_move(&self, destination: &VirtualFile) -> Result<(), FsError> {
        if self.path.is_root() {
            return Err(FsError::Unsupported("renaming the root"));
        }
        let node = self
            .node()
            .ok_or_else(|| FsError::NotFound(self.path.clone()))?;
        if !destination.is_writable() {
            return Err(FsError::PermissionDenied(destination.path.clone()));
        }
        if self.path.parent() != destination.path.parent() {
            warn!(
                from = %self.path,
                to = %destination.path,
                "Cross-directory move is not supported; renaming in place"
            );
        }

        let new_name = destination.name();
        if !self.resolver.provider().rename(node, new_name)? {
            return Err(FsError::Declined {
                op: "rename",
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Children of this directory, `None` if this is not a directory.
    ///
    /// Each child's path is this path joined with the listed name.
    pub fn list_files(&self) -> Option<Vec<VirtualFile>> {
        let node = self.node().filter(|n| n.is_directory())?;
        let children = self.outcome(
            "list",
            self.resolver
                .provider()
                .list_children(node)
                .map_err(FsError::from),
        )?;

        Some(
            children
                .into_iter()
                .map(|child| {
                    VirtualFile::listed(
                        self.path.join(&child.name),
                        Arc::clone(&self.resolver),
                        Arc::clone(&self.user),
                        child,
                        node.clone(),
                    )
                })
                .collect(),
        )
    }

    /// Parent node and leaf name under which this path would be created.
    pub(crate) fn creation_target(&self) -> Result<(&DocumentNode, &str), FsError> {
        let name = self
            .path
            .file_name()
            .ok_or(FsError::Unsupported("creating the root"))?;
        let parent = self.parent_node().ok_or_else(|| {
            FsError::NotFound(self.path.parent().unwrap_or_default())
        })?;
        Ok((parent, name))
    }

    /// Log a failed operation and collapse it to `None`.
    pub(crate) fn outcome<T>(&self, op: &'static str, result: Result<T, FsError>) -> Option<T> {
        match result {
            Ok(value) => {
                debug!(path = %self.path, "{} succeeded", op);
                Some(value)
            }
            Err(e) if e.is_provider_failure() => {
                warn!(path = %self.path, error = %e, "{} failed", op);
                None
            }
            Err(e) => {
                debug!(path = %self.path, reason = %e, "{} refused", op);
                None
            }
        }
    }
}

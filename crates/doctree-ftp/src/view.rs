use std::sync::Arc;

use doctree_core::{DocumentProvider, RootCapability};
use tracing::debug;

use crate::file::VirtualFile;
use crate::path::{normalize, CanonicalPath};
use crate::resolver::NodeResolver;
use crate::user::SessionUser;

/// One client session's view of the document tree.
///
/// Owns the session's working directory and nothing else. A view is driven
/// by the thread serving its connection and is never shared between
/// sessions.
#[derive(Debug)]
pub struct FileSystemView {
    resolver: Arc<NodeResolver>,
    user: Arc<SessionUser>,
    working_dir: CanonicalPath,
}

impl FileSystemView {
    /// View over the subtree granted by `root`, starting at its top.
    pub fn new(
        provider: Arc<dyn DocumentProvider>,
        root: RootCapability,
        user: SessionUser,
    ) -> Self {
        Self::with_resolver(Arc::new(NodeResolver::new(provider, root)), user)
    }

    pub(crate) fn with_resolver(resolver: Arc<NodeResolver>, user: SessionUser) -> Self {
        Self {
            resolver,
            user: Arc::new(user),
            working_dir: CanonicalPath::root(),
        }
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    /// Always the granted root.
    pub fn home_directory(&self) -> CanonicalPath {
        CanonicalPath::root()
    }

    pub fn working_directory(&self) -> &CanonicalPath {
        &self.working_dir
    }

    /// Move the working directory to `target`, relative to the current one.
    ///
    /// Only commits when the target resolves to an existing directory.
    pub fn change_working_directory(&mut self, target: &str) -> bool {
        let candidate = self.get_file(target);
        if !candidate.is_directory() {
            debug!(
                user = self.user.name(),
                target = %candidate.path(),
                "Working directory unchanged: not a directory"
            );
            return false;
        }

        debug!(
            user = self.user.name(),
            from = %self.working_dir,
            to = %candidate.path(),
            "Changed working directory"
        );
        self.working_dir = candidate.path().clone();
        true
    }

    /// File for `target`, relative to the working directory.
    ///
    /// Does not require the path to exist; uploads create it later.
    pub fn get_file(&self, target: &str) -> VirtualFile {
        VirtualFile::new(
            normalize(target, &self.working_dir),
            Arc::clone(&self.resolver),
            Arc::clone(&self.user),
        )
    }

    /// Streams are sequential-only.
    pub fn is_random_accessible(&self) -> bool {
        false
    }

    /// Nothing to release: the view holds no provider handles.
    pub fn dispose(&mut self) {}
}

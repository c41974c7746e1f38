use std::fmt;
use std::sync::Arc;

use doctree_core::{DocumentNode, DocumentProvider, ProviderError, RootCapability};
use tracing::{trace, warn};

use crate::path::CanonicalPath;

/// Walks canonical paths down a document tree.
///
/// Holds no node state: every call starts again from the root capability and
/// performs one name lookup per segment. Results are only as fresh as the
/// walk that produced them.
pub struct NodeResolver {
    provider: Arc<dyn DocumentProvider>,
    root: RootCapability,
}

impl NodeResolver {
    pub fn new(provider: Arc<dyn DocumentProvider>, root: RootCapability) -> Self {
        Self { provider, root }
    }

    pub fn provider(&self) -> &dyn DocumentProvider {
        self.provider.as_ref()
    }

    pub fn root_capability(&self) -> &RootCapability {
        &self.root
    }

    /// Resolve the root node, surfacing the provider error.
    ///
    /// Hosts use this to fail fast on a revoked or unknown capability before
    /// accepting sessions.
    pub fn check_root(&self) -> Result<DocumentNode, ProviderError> {
        self.provider.resolve_root(&self.root)
    }

    /// Node at `path`, or `None` if any segment is missing or the provider
    /// failed along the way.
    pub fn resolve(&self, path: &CanonicalPath) -> Option<DocumentNode> {
        match self.try_resolve(path) {
            Ok(node) => node,
            Err(e) => {
                warn!(path = %path, error = %e, "Resolution failed");
                None
            }
        }
    }

    /// Node of the parent directory of `path`; `None` for the root.
    pub fn resolve_parent(&self, path: &CanonicalPath) -> Option<DocumentNode> {
        path.parent().and_then(|parent| self.resolve(&parent))
    }

    fn try_resolve(
        &self,
        path: &CanonicalPath,
    ) -> Result<Option<DocumentNode>, ProviderError> {
        let mut current = self.provider.resolve_root(&self.root)?;
        for segment in path.segments() {
            match self.provider.find_child(&current, segment)? {
                Some(child) => current = child,
                None => {
                    trace!(path = %path, missing = segment, "Path does not resolve");
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }
}

impl fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeResolver")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

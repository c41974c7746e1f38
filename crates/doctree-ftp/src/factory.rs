use std::sync::Arc;

use doctree_core::{DocumentNode, DocumentProvider, ProviderError, RootCapability};
use tracing::info;

use crate::resolver::NodeResolver;
use crate::user::SessionUser;
use crate::view::FileSystemView;

/// Hands out one `FileSystemView` per client session.
///
/// All views share the provider and the root capability; each keeps its own
/// working directory.
#[derive(Debug, Clone)]
pub struct FileSystemFactory {
    resolver: Arc<NodeResolver>,
}

impl FileSystemFactory {
    pub fn new(provider: Arc<dyn DocumentProvider>, root: RootCapability) -> Self {
        Self {
            resolver: Arc::new(NodeResolver::new(provider, root)),
        }
    }

    pub fn root_capability(&self) -> &RootCapability {
        self.resolver.root_capability()
    }

    /// Resolve the root once, surfacing why it cannot be reached.
    pub fn check_root(&self) -> Result<DocumentNode, ProviderError> {
        self.resolver.check_root()
    }

    pub fn create_view(&self, user: SessionUser) -> FileSystemView {
        info!(user = user.name(), "Opening file system view");
        FileSystemView::with_resolver(Arc::clone(&self.resolver), user)
    }
}

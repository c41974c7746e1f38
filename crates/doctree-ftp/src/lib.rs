//! File-protocol adapter over a document tree.
//!
//! A file-transfer server thinks in absolute slash-separated paths, stateless
//! per-call addressing and boolean results. A document tree only offers a
//! root capability and name lookups. This crate bridges the two:
//! - `normalize` / `CanonicalPath`: protocol paths to canonical form
//! - `NodeResolver`: canonical paths to document nodes, one fresh walk per call
//! - `VirtualFile`: per-call metadata, permission, mutation and stream surface
//! - `FileSystemView`: per-session working directory
//! - `FileSystemFactory`: one view per session over a shared provider
//!
//! Expected failures (missing paths, missing grants, unsupported operations)
//! never surface as errors: they degrade to `false` or `None` and are logged.

mod error;
mod factory;
mod file;
mod path;
mod resolver;
mod stream;
mod user;
mod view;

pub use error::FsError;
pub use factory::FileSystemFactory;
pub use file::VirtualFile;
pub use path::{normalize, CanonicalPath};
pub use resolver::NodeResolver;
pub use stream::{FileReader, FileWriter, STREAM_BUFFER_SIZE};
pub use user::SessionUser;
pub use view::FileSystemView;

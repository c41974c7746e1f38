//! Sequential transfer streams.
//!
//! The document tree only hands out forward-only byte channels, so the offset
//! a transfer starts from is fixed when the stream is opened: reads skip
//! ahead, writes append. There is no seeking afterwards.

use std::io::{self, BufReader, BufWriter, Read};

use doctree_core::{DocumentNode, InputChannel, OutputChannel, WriteMode, GENERIC_MIME_TYPE};
use tracing::{debug, instrument};

use crate::error::FsError;
use crate::file::VirtualFile;

/// Buffer size of both stream directions.
pub const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered reader over a document's content.
pub type FileReader = BufReader<InputChannel>;

/// Buffered writer over a document's content.
///
/// Dropping it flushes on a best-effort basis and discards any error; call
/// `flush` before dropping to learn whether the data reached the provider.
pub type FileWriter = BufWriter<OutputChannel>;

impl VirtualFile {
    /// Open the content for reading, starting `offset` bytes in.
    ///
    /// `None` if the path is not readable, does not resolve to a file, or the
    /// provider refused to open it.
    #[instrument(skip(self), level = "debug", fields(path = %self.path()))]
    pub fn create_input_stream(&self, offset: u64) -> Option<FileReader> {
        self.outcome("open for reading", self.try_open_input(offset))
    }

    fn try_open_input(&self, offset: u64) -> Result<FileReader, FsError> {
        if !self.is_readable() {
            return Err(FsError::PermissionDenied(self.path().clone()));
        }
        let node = self
            .node()
            .ok_or_else(|| FsError::NotFound(self.path().clone()))?;
        if !node.is_file() {
            return Err(FsError::Unsupported("reading a directory"));
        }

        let channel = self.resolver().provider().open_input(node)?;
        let mut reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, channel);
        if offset > 0 {
            let skipped = io::copy(&mut (&mut reader).take(offset), &mut io::sink())?;
            if skipped < offset {
                debug!(offset, skipped, "Read offset is past the end of the document");
            }
        }
        Ok(reader)
    }

    /// Open the content for writing.
    ///
    /// A missing file is created in its parent first, which is not atomic
    /// with the open that follows. An existing file is appended to when
    /// `offset > 0` and truncated otherwise.
    #[instrument(skip(self), level = "debug", fields(path = %self.path()))]
    pub fn create_output_stream(&self, offset: u64) -> Option<FileWriter> {
        self.outcome("open for writing", self.try_open_output(offset))
    }

    fn try_open_output(&self, offset: u64) -> Result<FileWriter, FsError> {
        if !self.is_writable() {
            return Err(FsError::PermissionDenied(self.path().clone()));
        }

        let created: DocumentNode;
        let node = match self.node() {
            Some(node) if node.is_file() => node,
            Some(_) => return Err(FsError::Unsupported("writing to a directory")),
            None => {
                let (parent, name) = self.creation_target()?;
                created = self
                    .resolver()
                    .provider()
                    .create_file(parent, GENERIC_MIME_TYPE, name)?;
                debug!(uri = %created.uri, "Created document for upload");
                &created
            }
        };

        let mode = if offset > 0 {
            WriteMode::Append
        } else {
            WriteMode::Truncate
        };
        let channel = self.resolver().provider().open_output(node, mode)?;
        Ok(BufWriter::with_capacity(STREAM_BUFFER_SIZE, channel))
    }
}

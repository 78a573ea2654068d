use std::fs::File;
use std::io::{self, Cursor, Read};
use std::ops::{Deref, DerefMut};

use crate::diagnostic::{LoadError, Reporter};

/// Byte stream behind a resolved script or resource.
///
/// `close` is explicit so that a failing close can be reported; dropping an
/// unclosed stream still releases it, silently.
pub trait SourceStream: Read {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SourceStream for File {}

impl<T: AsRef<[u8]>> SourceStream for Cursor<T> {}

/// An opened source plus the name used for it in diagnostics.
pub struct ResolvedSource {
    /// Absolute filesystem path or normalized resource path
    pub display_name: String,
    pub stream: Box<dyn SourceStream>,
}

impl ResolvedSource {
    pub fn new(display_name: impl Into<String>, stream: impl SourceStream + 'static) -> Self {
        Self {
            display_name: display_name.into(),
            stream: Box::new(stream),
        }
    }

    /// Read the remainder of the stream as UTF-8 text.
    pub fn read_text(&mut self) -> io::Result<String> {
        let mut bytes = Vec::new();
        self.stream.read_to_end(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl std::fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSource")
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Closes the wrapped source exactly once when dropped.
///
/// A close failure goes to the reporter as [`LoadError::Close`].
pub(crate) struct ClosingGuard<'r> {
    source: ResolvedSource,
    reporter: &'r dyn Reporter,
}

impl<'r> ClosingGuard<'r> {
    pub(crate) fn new(source: ResolvedSource, reporter: &'r dyn Reporter) -> Self {
        Self { source, reporter }
    }
}

impl Deref for ClosingGuard<'_> {
    type Target = ResolvedSource;

    fn deref(&self) -> &ResolvedSource {
        &self.source
    }
}

impl DerefMut for ClosingGuard<'_> {
    fn deref_mut(&mut self) -> &mut ResolvedSource {
        &mut self.source
    }
}

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        if let Err(cause) = self.source.stream.close() {
            tracing::warn!(
                target: "harness",
                "Failed to close {}: {}",
                self.source.display_name,
                cause
            );
            self.reporter.error(&LoadError::Close {
                source_name: self.source.display_name.clone(),
                cause,
            });
        }
    }
}

// Shared test doubles for the harness integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use jsharness_host::{LoadError, Reporter, ResolvedSource, ResourceResolver, SourceStream, Warning};

/// Reporter that keeps everything it is given.
#[derive(Default)]
pub struct CollectingReporter {
    pub warnings: RefCell<Vec<Warning>>,
    pub errors: RefCell<Vec<(&'static str, String)>>,
}

impl CollectingReporter {
    pub fn error_kinds(&self) -> Vec<&'static str> {
        self.errors.borrow().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn error_texts(&self) -> Vec<String> {
        self.errors.borrow().iter().map(|(_, text)| text.clone()).collect()
    }
}

impl Reporter for CollectingReporter {
    fn warning(&self, warning: &Warning) {
        self.warnings.borrow_mut().push(warning.clone());
    }

    fn error(&self, error: &LoadError) {
        let kind = match error {
            LoadError::Open { .. } => "open",
            LoadError::Syntax { .. } => "syntax",
            LoadError::Native { .. } => "native",
            LoadError::Thrown { .. } => "thrown",
            LoadError::Read { .. } => "read",
            LoadError::Close { .. } => "close",
        };
        self.errors.borrow_mut().push((kind, error.render()));
    }
}

/// In-memory stand-in for process stdout.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("utf-8 output")
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stream that counts how many times it was closed.
pub struct CountingStream {
    inner: Cursor<Vec<u8>>,
    fail_reads: bool,
    closes: Rc<Cell<usize>>,
}

impl Read for CountingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_reads {
            return Err(io::Error::other("device error"));
        }
        self.inner.read(buf)
    }
}

impl SourceStream for CountingStream {
    fn close(&mut self) -> io::Result<()> {
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}

/// Resolver serving fixed sources through [`CountingStream`]s.
#[derive(Default)]
pub struct CountingResolver {
    sources: HashMap<String, (Vec<u8>, bool)>,
    pub closes: Rc<Cell<usize>>,
}

impl CountingResolver {
    pub fn with_source(mut self, name: &str, text: &str) -> Self {
        self.sources
            .insert(name.to_string(), (text.as_bytes().to_vec(), false));
        self
    }

    pub fn with_unreadable(mut self, name: &str) -> Self {
        self.sources.insert(name.to_string(), (Vec::new(), true));
        self
    }
}

impl ResourceResolver for CountingResolver {
    fn resolve(&self, path: &str) -> Result<ResolvedSource, LoadError> {
        match self.sources.get(path) {
            Some((bytes, fail_reads)) => Ok(ResolvedSource::new(
                path,
                CountingStream {
                    inner: Cursor::new(bytes.clone()),
                    fail_reads: *fail_reads,
                    closes: self.closes.clone(),
                },
            )),
            None => Err(LoadError::resource_not_found(path)),
        }
    }

    fn open_file(&self, file: &Path) -> Result<ResolvedSource, LoadError> {
        self.resolve(&file.to_string_lossy())
    }
}

pub fn write_script(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create script dir");
    }
    fs::write(&path, text).expect("Failed to write script");
    path
}

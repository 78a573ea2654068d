use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::diagnostic::{LoadError, OpenKind};
use crate::stream::{ResolvedSource, SourceStream};

/// Turns the path strings scripts use into open byte streams.
pub trait ResourceResolver {
    /// Filesystem first, then the bundled resource namespace.
    fn resolve(&self, path: &str) -> Result<ResolvedSource, LoadError>;

    /// Open a known file directly, without falling back to bundled resources.
    fn open_file(&self, file: &Path) -> Result<ResolvedSource, LoadError>;
}

/// Map a script path onto the bundled resource namespace.
///
/// One leading `.` is dropped and the result always starts with exactly one
/// `/`, so `./lib/a.js`, `lib/a.js` and `/lib/a.js` all name `/lib/a.js`.
pub fn normalize_resource_path(path: &str) -> String {
    let stripped = path.strip_prefix('.').unwrap_or(path);
    format!("/{}", stripped.trim_start_matches('/'))
}

/// Resources packaged alongside the harness.
///
/// In-memory entries are consulted before root directories; the first hit wins.
#[derive(Debug, Clone, Default)]
pub struct ResourceBundle {
    entries: HashMap<String, Cow<'static, [u8]>>,
    roots: Vec<PathBuf>,
}

impl ResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an in-memory resource, typically compiled in with `include_bytes!`.
    pub fn with_entry(mut self, name: &str, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        self.entries
            .insert(normalize_resource_path(name), bytes.into());
        self
    }

    /// Add a directory whose contents are served as resources.
    pub fn with_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.roots.push(dir.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Look up an already-normalized resource name.
    pub fn open(&self, name: &str) -> Option<io::Result<Box<dyn SourceStream>>> {
        if let Some(bytes) = self.entries.get(name) {
            return Some(Ok(Box::new(Cursor::new(bytes.clone()))));
        }

        let relative = name.trim_start_matches('/');
        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
            .map(|candidate| {
                File::open(candidate).map(|file| Box::new(file) as Box<dyn SourceStream>)
            })
    }
}

/// Resolver over the process filesystem and a [`ResourceBundle`].
#[derive(Debug, Clone)]
pub struct DefaultResolver {
    working_dir: PathBuf,
    bundle: ResourceBundle,
}

impl DefaultResolver {
    /// Relative paths resolve against the current working directory.
    pub fn new(bundle: ResourceBundle) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            working_dir,
            bundle,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    fn filesystem_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

impl Default for DefaultResolver {
    fn default() -> Self {
        Self::new(ResourceBundle::default())
    }
}

impl ResourceResolver for DefaultResolver {
    fn resolve(&self, path: &str) -> Result<ResolvedSource, LoadError> {
        // An empty path would otherwise land on the working directory itself
        if !path.is_empty() {
            let candidate = self.filesystem_path(Path::new(path));
            if candidate.exists() {
                debug!(target: "harness", "Resolved {} on the filesystem", path);
                return self.open_file(&candidate);
            }
        }

        let name = normalize_resource_path(path);
        match self.bundle.open(&name) {
            Some(Ok(stream)) => {
                debug!(target: "harness", "Resolved {} as bundled resource {}", path, name);
                Ok(ResolvedSource {
                    display_name: name,
                    stream,
                })
            }
            Some(Err(cause)) => Err(LoadError::Open {
                kind: OpenKind::Resource,
                source_name: name,
                cause: Some(cause),
            }),
            None => Err(LoadError::resource_not_found(name)),
        }
    }

    fn open_file(&self, file: &Path) -> Result<ResolvedSource, LoadError> {
        let absolute = self.filesystem_path(file);
        let display_name = absolute.display().to_string();
        // Some platforms open a directory without complaint and only fail on read
        let opened = if absolute.is_dir() {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory"))
        } else {
            File::open(&absolute)
        };
        match opened {
            Ok(handle) => Ok(ResolvedSource::new(display_name, handle)),
            Err(cause) => Err(LoadError::open_file(display_name, cause)),
        }
    }
}

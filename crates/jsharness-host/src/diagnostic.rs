use std::fmt::Write as _;
use std::io;

use thiserror::Error;

/// Why loading one script source failed.
///
/// None of these escape the script loader: each is handed to the session's
/// [`Reporter`] and the harness moves on to the next source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing could be opened for the requested path or file.
    #[error("Couldn't open {kind} \"{source_name}\".")]
    Open {
        kind: OpenKind,
        source_name: String,
        #[source]
        cause: Option<io::Error>,
    },

    /// The engine rejected the source text.
    #[error("{message}")]
    Syntax {
        message: String,
        source_name: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
    },

    /// A host-side failure surfaced through the engine.
    #[error("{message}")]
    Native {
        message: String,
        stack: Option<String>,
    },

    /// The script threw and nothing caught it.
    #[error("{message}")]
    Thrown {
        message: String,
        source_name: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
    },

    /// The source stream failed while being read.
    #[error("{source_name}: {cause}")]
    Read {
        source_name: String,
        #[source]
        cause: io::Error,
    },

    /// The source stream failed to close.
    #[error("{source_name}: {cause}")]
    Close {
        source_name: String,
        #[source]
        cause: io::Error,
    },
}

/// What the resolver was asked to open when it came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    File,
    Resource,
}

impl std::fmt::Display for OpenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenKind::File => write!(f, "file"),
            OpenKind::Resource => write!(f, "resource"),
        }
    }
}

impl LoadError {
    pub fn open_file(source_name: impl Into<String>, cause: io::Error) -> Self {
        LoadError::Open {
            kind: OpenKind::File,
            source_name: source_name.into(),
            cause: Some(cause),
        }
    }

    pub fn resource_not_found(source_name: impl Into<String>) -> Self {
        LoadError::Open {
            kind: OpenKind::Resource,
            source_name: source_name.into(),
            cause: None,
        }
    }

    /// Text written to standard error for this failure.
    ///
    /// Syntax and thrown errors carry the `js: ` prefix existing build tooling
    /// greps for; native failures print their stack below the message.
    pub fn render(&self) -> String {
        match self {
            LoadError::Syntax {
                message,
                source_name,
                line,
                ..
            }
            | LoadError::Thrown {
                message,
                source_name,
                line,
                ..
            } => {
                let mut text = format!("js: {message}");
                match (source_name, line) {
                    (Some(name), Some(line)) => {
                        let _ = write!(text, " ({name}#{line})");
                    }
                    (Some(name), None) => {
                        let _ = write!(text, " ({name})");
                    }
                    _ => {}
                }
                text
            }
            LoadError::Native { message, stack } => match stack {
                Some(stack) if !stack.is_empty() => format!("{message}\n{}", stack.trim_end()),
                _ => message.clone(),
            },
            other => other.to_string(),
        }
    }
}

/// A warning raised by a script through the `warn` host function.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    pub source_name: Option<String>,
    pub line: i32,
    pub line_source: Option<String>,
    pub column: i32,
}

/// Sink for everything the harness reports instead of raising.
pub trait Reporter {
    fn warning(&self, warning: &Warning);

    fn error(&self, error: &LoadError);
}

/// Default reporter: plain text on standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn warning(&self, warning: &Warning) {
        tracing::debug!(target: "harness", "Script warning: {}", warning.message);
        match &warning.line_source {
            Some(src) => eprintln!(
                "js: warning: {} ({}#{}:{})",
                warning.message, src, warning.line, warning.column
            ),
            None => eprintln!("js: warning: {}", warning.message),
        }
    }

    fn error(&self, error: &LoadError) {
        eprintln!("{}", error.render());
    }
}

//! Host harness for running build scripts against an embedded JavaScript engine.
//!
//! A [`Session`] owns one engine context and one global scope. Five host
//! functions are installed into that scope (`print`, `warn`, `load`,
//! `readFile`, `getResourceAsStream`), followed by `arguments` and any
//! caller-supplied globals. Includes are then evaluated in order, and the main
//! script runs last in the fully populated scope.
//!
//! Script paths resolve against the filesystem first and fall back to a
//! [`ResourceBundle`] of packaged resources. Failures while loading a script
//! are reported through a [`Reporter`] and never abort the session.

pub mod bridge;
pub mod diagnostic;
pub mod loader;
pub mod resolver;
pub mod session;
pub mod stream;
pub mod value;

pub use bridge::{HOST_ERROR_NAME, HOST_FUNCTIONS};
pub use diagnostic::{LoadError, OpenKind, Reporter, StderrReporter, Warning};
pub use loader::ScriptLoader;
pub use resolver::{normalize_resource_path, DefaultResolver, ResourceBundle, ResourceResolver};
pub use session::{run, HarnessError, Session, SessionBuilder};
pub use stream::{ResolvedSource, SourceStream};
pub use value::ScriptValue;

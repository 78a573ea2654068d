use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rquickjs::{Context, FromJs, Runtime};
use thiserror::Error;
use tracing::{debug, info};

use crate::bridge::{self, Host};
use crate::diagnostic::{LoadError, Reporter, StderrReporter};
use crate::loader::{self, ScriptLoader};
use crate::resolver::{DefaultResolver, ResourceResolver};
use crate::value::ScriptValue;

/// Failures that escape a session.
///
/// Script problems are reported, not returned; only engine setup (and the
/// host-side [`Session::eval`] helper) produce these.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to set up script engine: {0}")]
    Setup(#[from] rquickjs::Error),

    #[error("{}", .0.render())]
    Script(LoadError),
}

/// Configures a [`Session`] before its engine context is created.
pub struct SessionBuilder {
    resolver: Option<Rc<dyn ResourceResolver>>,
    reporter: Option<Rc<dyn Reporter>>,
    stdout: Option<Box<dyn Write>>,
    arguments: Vec<ScriptValue>,
    globals: Vec<(String, ScriptValue)>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            resolver: None,
            reporter: None,
            stdout: None,
            arguments: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// Resolver for script paths (default: [`DefaultResolver`] with an empty bundle)
    pub fn resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    /// Sink for diagnostics (default: [`StderrReporter`])
    pub fn reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Destination for `print` (default: process stdout)
    pub fn stdout(mut self, stdout: impl Write + 'static) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    /// Values exposed to scripts as the `arguments` array
    pub fn arguments<I, V>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ScriptValue>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn global(mut self, name: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.globals.push((name.into(), value.into()));
        self
    }

    /// Global bindings, installed in the iteration order of `globals`.
    pub fn globals<I, K, V>(mut self, globals: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ScriptValue>,
    {
        self.globals
            .extend(globals.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Acquire the engine context and populate the global scope.
    ///
    /// Host functions go in first, then `arguments`, then the caller's
    /// globals, all non-enumerable.
    pub fn build(self) -> Result<Session, HarnessError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        let resolver = self
            .resolver
            .unwrap_or_else(|| Rc::new(DefaultResolver::default()));
        let reporter = self.reporter.unwrap_or_else(|| Rc::new(StderrReporter));
        let stdout = self.stdout.unwrap_or_else(|| Box::new(io::stdout()));
        let host = Rc::new(Host::new(ScriptLoader::new(resolver, reporter), stdout));

        let arguments = self.arguments;
        let globals = self.globals;
        context.with(|ctx| -> rquickjs::Result<()> {
            bridge::install(&ctx, &host)?;

            let scope = ctx.globals();
            let argv = ScriptValue::Array(arguments).to_js(&ctx)?;
            bridge::define_hidden(&ctx, &scope, "arguments", argv)?;

            for (name, value) in &globals {
                debug!(target: "harness", "Binding global {}", name);
                bridge::define_hidden(&ctx, &scope, name, value.to_js(&ctx)?)?;
            }
            Ok(())
        })?;

        debug!(target: "harness", "Session ready");
        Ok(Session {
            host,
            context,
            _runtime: runtime,
        })
    }
}

/// One harness invocation: an engine context and its single global scope.
///
/// Dropping the session releases the context, whatever the scripts did.
pub struct Session {
    host: Rc<Host>,
    // Declared before the runtime so it is released first
    context: Context,
    _runtime: Runtime,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Evaluate a bootstrap file into the shared scope.
    pub fn include(&self, file: impl AsRef<Path>) {
        let file = file.as_ref();
        self.context
            .with(|ctx| self.host.loader().load_file(&ctx, file));
    }

    /// Evaluate the main script. Same as [`Session::include`], named for the call site.
    pub fn run_main(&self, file: impl AsRef<Path>) {
        self.include(file);
    }

    /// Load a path exactly as a script's `load()` would.
    pub fn load(&self, path: &str) {
        self.context
            .with(|ctx| self.host.loader().load_path(&ctx, path));
    }

    /// Run the includes in order, then the main script.
    pub fn execute<P: AsRef<Path>>(&self, includes: &[P], main_script: impl AsRef<Path>) {
        for include in includes {
            self.include(include);
        }
        self.run_main(main_script);
    }

    /// Evaluate host-side code in the session scope and convert the result.
    ///
    /// Unlike script loading, failures here are returned to the caller.
    pub fn eval<T>(&self, source: &str) -> Result<T, HarnessError>
    where
        T: for<'js> FromJs<'js>,
    {
        self.context.with(|ctx| {
            ctx.eval_with_options::<T, _>(source, loader::script_options())
                .map_err(|err| HarnessError::Script(loader::classify(&ctx, err, None)))
        })
    }
}

/// Run a complete session: includes in order, then the main script.
///
/// Script failures are delivered to `reporter`; only engine setup failures
/// are returned. Globals are bound in the iteration order of
/// `global_variables`, so a `HashMap` gives no ordering guarantee.
pub fn run<I, G>(
    includes: &[PathBuf],
    main_script: &Path,
    args: I,
    global_variables: G,
    reporter: Rc<dyn Reporter>,
) -> Result<(), HarnessError>
where
    I: IntoIterator,
    I::Item: Into<ScriptValue>,
    G: IntoIterator<Item = (String, ScriptValue)>,
{
    info!(
        target: "harness",
        "Running {} with {} include(s)",
        main_script.display(),
        includes.len()
    );

    let session = Session::builder()
        .reporter(reporter)
        .arguments(args)
        .globals(global_variables)
        .build()?;
    session.execute(includes, main_script);

    info!(target: "harness", "Finished {}", main_script.display());
    Ok(())
}

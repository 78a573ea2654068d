use std::path::Path;
use std::rc::Rc;

use rquickjs::context::EvalOptions;
use rquickjs::convert::Coerced;
use rquickjs::{Ctx, Value};
use tracing::{debug, warn};

use crate::bridge::HOST_ERROR_NAME;
use crate::diagnostic::{LoadError, Reporter};
use crate::resolver::ResourceResolver;
use crate::stream::{ClosingGuard, ResolvedSource};

/// Resolves script sources and evaluates them into the session's global scope.
///
/// Loading never fails at the call site: every problem becomes a
/// [`LoadError`] handed to the reporter, and the caller carries on with the
/// next source.
pub struct ScriptLoader {
    resolver: Rc<dyn ResourceResolver>,
    reporter: Rc<dyn Reporter>,
}

impl ScriptLoader {
    pub fn new(resolver: Rc<dyn ResourceResolver>, reporter: Rc<dyn Reporter>) -> Self {
        Self { resolver, reporter }
    }

    pub fn resolver(&self) -> &dyn ResourceResolver {
        &*self.resolver
    }

    pub fn reporter(&self) -> &dyn Reporter {
        &*self.reporter
    }

    /// Load a path the way scripts name it: filesystem first, then bundled resources.
    pub fn load_path(&self, ctx: &Ctx<'_>, path: &str) {
        debug!(target: "harness", "Loading {}", path);
        match self.resolver.resolve(path) {
            Ok(source) => self.evaluate(ctx, source),
            Err(error) => self.report(error),
        }
    }

    /// Load a known file, skipping the bundled resource fallback.
    pub fn load_file(&self, ctx: &Ctx<'_>, file: &Path) {
        debug!(target: "harness", "Loading file {}", file.display());
        match self.resolver.open_file(file) {
            Ok(source) => self.evaluate(ctx, source),
            Err(error) => self.report(error),
        }
    }

    fn evaluate(&self, ctx: &Ctx<'_>, source: ResolvedSource) {
        let mut source = ClosingGuard::new(source, &*self.reporter);
        if let Err(error) = evaluate_source(ctx, &mut source) {
            self.report(error);
        }
    }

    fn report(&self, error: LoadError) {
        warn!(target: "harness", "Script load failed: {}", error);
        self.reporter.error(&error);
    }
}

fn evaluate_source(ctx: &Ctx<'_>, source: &mut ResolvedSource) -> Result<(), LoadError> {
    let text = source.read_text().map_err(|cause| LoadError::Read {
        source_name: source.display_name.clone(),
        cause,
    })?;

    let _: Value = ctx
        .eval_with_options(text, script_options())
        .map_err(|err| classify(ctx, err, Some(source.display_name.as_str())))?;

    debug!(target: "harness", "Evaluated {}", source.display_name);
    Ok(())
}

/// Options for evaluating script text as sloppy-mode global code.
///
/// The engine default forces strict mode, which rejects implicit globals and
/// `with`.
pub(crate) fn script_options() -> EvalOptions {
    let mut options = EvalOptions::default();
    options.strict = false;
    options
}

/// File name the engine gives every evaluated script in its backtraces.
const ENGINE_FILE_NAME: &str = "eval_script";

/// Line and column of the innermost evaluated-script frame in a backtrace.
///
/// Backtrace lines look like `    at f (eval_script:3:25)`; syntax errors
/// carry a bare `    at eval_script:3:5`.
fn stack_position(stack: &str) -> Option<(u32, Option<u32>)> {
    let start = stack.find(ENGINE_FILE_NAME)? + ENGINE_FILE_NAME.len();
    let rest = stack[start..].strip_prefix(':')?;

    fn leading_number(text: &str) -> Option<(u32, &str)> {
        let end = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        text[..end].parse::<u32>().ok().map(|n| (n, &text[end..]))
    }

    let (line, rest) = leading_number(rest)?;
    let column = rest
        .strip_prefix(':')
        .and_then(leading_number)
        .map(|(column, _)| column);
    Some((line, column))
}

/// Turn an engine failure into the matching [`LoadError`].
///
/// Pending exceptions are taken off the engine, so evaluation can continue
/// in the same context afterwards.
pub(crate) fn classify(
    ctx: &Ctx<'_>,
    err: rquickjs::Error,
    source_name: Option<&str>,
) -> LoadError {
    if !matches!(err, rquickjs::Error::Exception) {
        return LoadError::Native {
            message: err.to_string(),
            stack: None,
        };
    }

    let thrown = ctx.catch();
    let source_name = source_name.map(str::to_string);

    let Some(object) = thrown.as_object() else {
        // `throw "text"` and friends
        let message = thrown
            .get::<Coerced<String>>()
            .map(|coerced| coerced.0)
            .unwrap_or_else(|_| "uncaught exception".to_string());
        return LoadError::Thrown {
            message,
            source_name,
            line: None,
            column: None,
        };
    };

    let prop_text = |key: &str| object.get::<_, Option<String>>(key).ok().flatten();
    let prop_number = |key: &str| {
        object
            .get::<_, Option<i32>>(key)
            .ok()
            .flatten()
            .and_then(|n| u32::try_from(n).ok())
    };

    let name = prop_text("name");
    let detail = prop_text("message");
    let message = match (&name, detail) {
        (Some(name), Some(detail)) if !detail.is_empty() => format!("{name}: {detail}"),
        (Some(name), _) => name.clone(),
        (None, Some(detail)) => detail,
        (None, None) => thrown
            .get::<Coerced<String>>()
            .map(|coerced| coerced.0)
            .unwrap_or_else(|_| "uncaught exception".to_string()),
    };
    let stack = prop_text("stack");
    let from_stack = stack.as_deref().and_then(stack_position);
    let line = prop_number("lineNumber").or(from_stack.map(|(line, _)| line));
    let column = prop_number("columnNumber").or(from_stack.and_then(|(_, column)| column));

    match name.as_deref() {
        Some("SyntaxError") => LoadError::Syntax {
            message,
            source_name,
            line,
            column,
        },
        Some(HOST_ERROR_NAME) => LoadError::Native { message, stack },
        _ => LoadError::Thrown {
            message,
            source_name,
            line,
            column,
        },
    }
}

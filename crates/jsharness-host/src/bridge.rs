//! Host functions exposed to scripts.
//!
//! Every function is a closure holding an `Rc<Host>`, the handle to the
//! session that installed it. Nested `load()` calls therefore always land in
//! the same session and the same global scope.

use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::rc::Rc;

use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, Object, Value};
use tracing::debug;

use crate::diagnostic::{LoadError, Warning};
use crate::loader::ScriptLoader;
use crate::stream::{ClosingGuard, ResolvedSource, SourceStream};

/// Value of `name` on errors raised by host functions.
pub const HOST_ERROR_NAME: &str = "HostError";

/// Names installed into every session's global scope.
pub const HOST_FUNCTIONS: [&str; 5] = ["print", "load", "readFile", "warn", "getResourceAsStream"];

/// Session state reachable from host functions.
pub(crate) struct Host {
    loader: ScriptLoader,
    stdout: RefCell<Box<dyn Write>>,
}

impl Host {
    pub(crate) fn new(loader: ScriptLoader, stdout: Box<dyn Write>) -> Self {
        Self {
            loader,
            stdout: RefCell::new(stdout),
        }
    }

    pub(crate) fn loader(&self) -> &ScriptLoader {
        &self.loader
    }

    fn print_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.stdout.borrow_mut();
        writeln!(out, "{line}")?;
        out.flush()
    }

    fn read_file(&self, path: &str) -> Result<String, String> {
        let source = self
            .loader
            .resolver()
            .resolve(path)
            .map_err(|err| format!("wrap: {err}"))?;
        let mut source = ClosingGuard::new(source, self.loader.reporter());
        source.read_text().map_err(|err| format!("wrap: {err}"))
    }
}

/// Install the host functions into the global object, hidden from enumeration.
pub(crate) fn install<'js>(ctx: &Ctx<'js>, host: &Rc<Host>) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    define_hidden(ctx, &globals, "print", print(ctx, host.clone())?.into_value())?;
    define_hidden(ctx, &globals, "load", load(ctx, host.clone())?.into_value())?;
    define_hidden(ctx, &globals, "readFile", read_file(ctx, host.clone())?.into_value())?;
    define_hidden(ctx, &globals, "warn", warn(ctx, host.clone())?.into_value())?;
    define_hidden(
        ctx,
        &globals,
        "getResourceAsStream",
        get_resource_as_stream(ctx, host.clone())?.into_value(),
    )?;
    Ok(())
}

/// Define a writable, configurable, non-enumerable property on `target`.
pub(crate) fn define_hidden<'js>(
    ctx: &Ctx<'js>,
    target: &Object<'js>,
    name: &str,
    value: Value<'js>,
) -> rquickjs::Result<()> {
    let object_ctor: Object<'js> = ctx.globals().get("Object")?;
    let define_property: Function<'js> = object_ctor.get("defineProperty")?;

    let descriptor = Object::new(ctx.clone())?;
    descriptor.set("value", value)?;
    descriptor.set("writable", true)?;
    descriptor.set("enumerable", false)?;
    descriptor.set("configurable", true)?;

    let _: Value<'js> = define_property.call((target.clone(), name, descriptor))?;
    Ok(())
}

/// Throw an `Error` named [`HOST_ERROR_NAME`] into the calling script.
pub(crate) fn host_error(ctx: &Ctx<'_>, message: &str) -> rquickjs::Error {
    match new_host_error(ctx, message) {
        Ok(error) => ctx.throw(error.into_value()),
        Err(err) => err,
    }
}

fn new_host_error<'js>(ctx: &Ctx<'js>, message: &str) -> rquickjs::Result<Object<'js>> {
    let error_ctor: Function<'js> = ctx.globals().get("Error")?;
    let error: Object<'js> = error_ctor.call((message,))?;
    error.set("name", HOST_ERROR_NAME)?;
    Ok(error)
}

fn print<'js>(ctx: &Ctx<'js>, host: Rc<Host>) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, values: Rest<Coerced<String>>| -> rquickjs::Result<()> {
            let line = values
                .0
                .into_iter()
                .map(|value| value.0)
                .collect::<Vec<_>>()
                .join(" ");
            host.print_line(&line)
                .map_err(|err| host_error(&ctx, &format!("wrap: {err}")))
        },
    )
}

// Callers must pass all four arguments; a short call fails in argument
// conversion rather than being padded.
fn warn<'js>(ctx: &Ctx<'js>, host: Rc<Host>) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |message: Coerced<String>,
              line: Coerced<f64>,
              source: Coerced<String>,
              column: Coerced<f64>| {
            host.loader().reporter().warning(&Warning {
                message: message.0,
                source_name: None,
                line: line.0 as i32,
                line_source: Some(source.0),
                column: column.0 as i32,
            });
        },
    )
}

fn read_file<'js>(ctx: &Ctx<'js>, host: Rc<Host>) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, path: Coerced<String>| -> rquickjs::Result<String> {
            host.read_file(&path.0)
                .map_err(|message| host_error(&ctx, &message))
        },
    )
}

fn load<'js>(ctx: &Ctx<'js>, host: Rc<Host>) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, paths: Rest<Coerced<String>>| {
            for path in paths.0 {
                host.loader().load_path(&ctx, &path.0);
            }
        },
    )
}

fn get_resource_as_stream<'js>(ctx: &Ctx<'js>, host: Rc<Host>) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, path: Coerced<String>| -> rquickjs::Result<Value<'js>> {
            match host.loader().resolver().resolve(&path.0) {
                Ok(source) => Ok(stream_object(&ctx, source)?.into_value()),
                Err(LoadError::Open { cause: None, .. }) => {
                    debug!(target: "harness", "No resource for {}", path.0);
                    Ok(Value::new_null(ctx.clone()))
                }
                Err(err) => Err(host_error(&ctx, &format!("wrap: {err}"))),
            }
        },
    )
}

type SharedReader = Rc<RefCell<Option<BufReader<Box<dyn SourceStream>>>>>;

/// Script-side handle over an open resource.
///
/// The script owns it from here on; if it never calls `close()` the stream
/// is released when the engine collects the handle.
fn stream_object<'js>(ctx: &Ctx<'js>, source: ResolvedSource) -> rquickjs::Result<Object<'js>> {
    let handle = Object::new(ctx.clone())?;
    handle.set("name", source.display_name.as_str())?;

    let reader: SharedReader = Rc::new(RefCell::new(Some(BufReader::new(source.stream))));

    let shared = reader.clone();
    handle.set(
        "readAll",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<String> {
                let mut slot = shared.borrow_mut();
                let reader = slot
                    .as_mut()
                    .ok_or_else(|| host_error(&ctx, "wrap: stream closed"))?;
                let mut text = String::new();
                reader
                    .read_to_string(&mut text)
                    .map_err(|err| host_error(&ctx, &format!("wrap: {err}")))?;
                Ok(text)
            },
        )?,
    )?;

    let shared = reader.clone();
    handle.set(
        "readLine",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<Option<String>> {
                let mut slot = shared.borrow_mut();
                let reader = slot
                    .as_mut()
                    .ok_or_else(|| host_error(&ctx, "wrap: stream closed"))?;
                let mut line = String::new();
                let read = reader
                    .read_line(&mut line)
                    .map_err(|err| host_error(&ctx, &format!("wrap: {err}")))?;
                if read == 0 {
                    return Ok(None);
                }
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Ok(Some(line))
            },
        )?,
    )?;

    let shared = reader;
    handle.set(
        "close",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>| -> rquickjs::Result<()> {
                match shared.borrow_mut().take() {
                    Some(reader) => reader
                        .into_inner()
                        .close()
                        .map_err(|err| host_error(&ctx, &format!("wrap: {err}"))),
                    None => Ok(()),
                }
            },
        )?,
    )?;

    Ok(handle)
}

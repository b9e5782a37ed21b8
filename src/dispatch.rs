//! argv → operation → rendered response
//!
//! Resolves the command token against the registry, parses the remaining
//! arguments with the operation's generated parser, invokes it, and renders
//! the response body (whole, or one field picked with `--select`).

use std::ffi::OsString;
use std::io::Write;

use clap::ArgMatches;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::builder::{build_command, normalize_command, FlagSpec};
use crate::error::{DispatchError, SelectPathError};
use crate::metadata::{MetadataTable, ValueType};
use crate::registry::{CallArgs, Operation, Registry, SELECT_PARAM};
use crate::request::{Executor, RequestResult};

/// Token that asks for help in place of a command or its arguments.
pub const HELP_TOKEN: &str = "help";

/// Exit status for anything but a successful remote call.
pub const EXIT_FAILURE: i32 = 1;

/// Routes one command line to one operation.
pub struct Dispatcher<'a> {
    prog: String,
    registry: &'a Registry,
    metadata: &'a MetadataTable,
    executor: &'a Executor,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        prog: impl Into<String>,
        registry: &'a Registry,
        metadata: &'a MetadataTable,
        executor: &'a Executor,
    ) -> Self {
        Self {
            prog: prog.into(),
            registry,
            metadata,
            executor,
        }
    }

    /// Run one command line (program name excluded) and return the exit
    /// status. Responses go to `out`; usage and diagnostics go to `err`.
    ///
    /// Only transport and output failures are returned as errors.
    pub fn run<O: Write, E: Write>(
        &self,
        args: &[String],
        out: &mut O,
        err: &mut E,
    ) -> Result<i32, DispatchError> {
        let Some(token) = args.first() else {
            self.print_listing(err)?;
            return Ok(EXIT_FAILURE);
        };

        let command = normalize_command(token);
        if command == HELP_TOKEN {
            self.print_listing(err)?;
            return Ok(EXIT_FAILURE);
        }

        let Some(op) = self.registry.lookup(&command) else {
            warn!(command = %command, "unknown command");
            writeln!(err, "ERROR: '{}' is not a valid command\n", command.replace('_', "-"))
                .map_err(DispatchError::Output)?;
            self.print_listing(err)?;
            return Ok(EXIT_FAILURE);
        };

        debug!(operation = %op.name, "resolved command");
        self.run_operation(op, &args[1..], out, err)
    }

    fn run_operation<O: Write, E: Write>(
        &self,
        op: &Operation,
        args: &[String],
        out: &mut O,
        err: &mut E,
    ) -> Result<i32, DispatchError> {
        let built = match build_command(&self.prog, op, self.metadata) {
            Ok(built) => built,
            Err(e) => {
                writeln!(err, "ERROR: {e}").map_err(DispatchError::Output)?;
                return Ok(EXIT_FAILURE);
            }
        };
        let mut command = built.command;

        if args.first().map(String::as_str) == Some(HELP_TOKEN) {
            write!(err, "{}", command.render_help()).map_err(DispatchError::Output)?;
            return Ok(EXIT_FAILURE);
        }

        let matches = match command.try_get_matches_from_mut(args) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(error = %e, "argument parsing failed");
                write!(err, "{}", e.render()).map_err(DispatchError::Output)?;
                return Ok(EXIT_FAILURE);
            }
        };

        let call_args = collect_call_args(op, &built.flags, &matches);
        let select = matches.get_one::<String>(SELECT_PARAM).cloned();

        debug!(operation = %op.name, args = call_args.len(), "invoking operation");
        let result = op.invoke(self.executor, &call_args)?;
        render(&result, select.as_deref(), out, err)
    }

    fn print_listing<E: Write>(&self, err: &mut E) -> Result<(), DispatchError> {
        write!(err, "{}", help_listing(self.registry)).map_err(DispatchError::Output)
    }
}

/// Convert raw process arguments to strings, returning the first one that is
/// not valid UTF-8.
pub fn utf8_args<I>(args: I) -> Result<Vec<String>, OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter().map(OsString::into_string).collect()
}

/// "Available commands are:" followed by every command, hyphenated and sorted.
pub fn help_listing(registry: &Registry) -> String {
    let mut msg = String::from("Available commands are:\n");
    for name in registry.names() {
        msg.push_str(&format!(" - {}\n", name.replace('_', "-")));
    }
    msg
}

/// Turn parsed flags back into named call arguments.
///
/// Flags given on the command line win; absent ones take the parameter's
/// declared default, so an unset switch yields its default (usually `null`)
/// rather than `false`.
fn collect_call_args(op: &Operation, flags: &[FlagSpec], matches: &ArgMatches) -> CallArgs {
    let mut call_args = CallArgs::new();
    for (param, flag) in op.parameters.iter().zip(flags) {
        let id = flag.param.as_str();
        let given = match flag.value_type {
            ValueType::String => matches
                .get_one::<String>(id)
                .map(|s| Value::String(s.clone())),
            ValueType::Int => matches.get_one::<i64>(id).map(|n| Value::from(*n)),
            ValueType::Switch => matches.get_flag(id).then_some(Value::Bool(true)),
            ValueType::List => matches
                .get_many::<String>(id)
                .map(|vals| vals.map(|v| Value::String(v.clone())).collect()),
        };
        if let Some(value) = given.or_else(|| param.default.clone()) {
            call_args.insert(param.name.clone(), value);
        }
    }
    call_args
}

/// Print the result and map `ok` to an exit status.
fn render<O: Write, E: Write>(
    result: &RequestResult,
    select: Option<&str>,
    out: &mut O,
    err: &mut E,
) -> Result<i32, DispatchError> {
    let rendered = match select {
        Some(path) => match select_path(&result.body, path) {
            Ok(value) => display_value(value),
            Err(e) => {
                warn!(path, error = %e, "selection failed");
                writeln!(err, "ERROR: {e}").map_err(DispatchError::Output)?;
                return Ok(EXIT_FAILURE);
            }
        },
        None => pretty(&result.body),
    };
    writeln!(out, "{rendered}").map_err(DispatchError::Output)?;

    Ok(if result.ok { 0 } else { EXIT_FAILURE })
}

/// Walk a dot-separated path into `body`. Each segment is an object key, or
/// an index when the current value is an array.
pub fn select_path<'v>(body: &'v Value, path: &str) -> Result<&'v Value, SelectPathError> {
    let mut current = body;
    let mut walked = String::new();
    for segment in path.split('.') {
        let at = if walked.is_empty() {
            "<root>".to_string()
        } else {
            walked.clone()
        };
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| SelectPathError::MissingKey {
                path: at,
                segment: segment.to_string(),
            })?,
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(|| SelectPathError::IndexOutOfRange {
                    path: at,
                    segment: segment.to_string(),
                })?,
            _ => {
                return Err(SelectPathError::NotAContainer {
                    path: at,
                    segment: segment.to_string(),
                })
            }
        };
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
    }
    Ok(current)
}

/// Selected values print verbatim: strings without quotes, anything else as
/// compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON with four-space indentation.
fn pretty(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}

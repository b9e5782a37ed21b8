//! Operation → clap `Command` builder
//!
//! Merges the global metadata table with an operation's overrides, derives
//! required-ness from the parameter list, and emits one long flag per
//! parameter plus the generic `--select` flag.

use clap::{value_parser, Arg, ArgAction, Command};

use crate::error::BuildError;
use crate::metadata::{MetadataTable, ValueType};
use crate::registry::{Operation, SELECT_PARAM};

/// Final, merged flag configuration for one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct FlagSpec {
    /// Parameter name, also the clap arg id
    pub param: String,
    /// Long flag without the leading dashes
    pub long: String,
    pub value_type: ValueType,
    pub help: String,
    pub metavar: Option<String>,
    pub required: bool,
}

/// A parser for one operation, with the flag specs it was built from.
#[derive(Debug, Clone)]
pub struct OperationCommand {
    pub command: Command,
    /// One entry per operation parameter, in declaration order
    pub flags: Vec<FlagSpec>,
}

/// Resolve the flag spec of every parameter of `op`.
pub fn flag_specs(op: &Operation, table: &MetadataTable) -> Result<Vec<FlagSpec>, BuildError> {
    op.parameters
        .iter()
        .map(|param| {
            let meta = table.merged(&op.overrides, &param.name);
            let value_type = match meta.value_type.as_deref() {
                None => ValueType::String,
                Some(declared) => {
                    declared
                        .parse::<ValueType>()
                        .map_err(|value_type| BuildError::UnknownFlagSyntax {
                            param: param.name.clone(),
                            value_type,
                        })?
                }
            };
            Ok(FlagSpec {
                param: param.name.clone(),
                long: flag_name(&param.name),
                value_type,
                help: meta.help.unwrap_or_default(),
                metavar: meta.metavar,
                required: param.is_required(),
            })
        })
        .collect()
}

/// Build the parser for `op`. `prog` is the root program name used in usage
/// text (e.g. `"tf"`).
pub fn build_command(
    prog: &str,
    op: &Operation,
    table: &MetadataTable,
) -> Result<OperationCommand, BuildError> {
    let flags = flag_specs(op, table)?;

    let mut cmd = Command::new(format!("{prog} {}", op.command_name()))
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true);
    if !op.summary.is_empty() {
        cmd = cmd.about(op.summary.clone());
    }

    for flag in &flags {
        cmd = cmd.arg(build_arg(flag));
    }

    cmd = cmd.arg(
        Arg::new(SELECT_PARAM)
            .long(SELECT_PARAM)
            .help("select a field from the response, in dot-notation (e.g. \"foo.0.bar\")")
            .action(ArgAction::Set),
    );

    Ok(OperationCommand {
        command: cmd,
        flags,
    })
}

fn build_arg(flag: &FlagSpec) -> Arg {
    let arg = Arg::new(flag.param.clone())
        .long(flag.long.clone())
        .help(flag.help.clone())
        .required(flag.required);

    let arg = match &flag.metavar {
        Some(metavar) => arg.value_name(metavar.clone()),
        None => arg,
    };

    match flag.value_type {
        ValueType::String => arg.action(ArgAction::Set),
        ValueType::Int => arg
            .action(ArgAction::Set)
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true),
        ValueType::Switch => arg.action(ArgAction::SetTrue),
        ValueType::List => arg.action(ArgAction::Append).num_args(1..),
    }
}

/// `account_id` → `account-id`
pub fn flag_name(param: &str) -> String {
    param.replace('_', "-")
}

/// Normalize a user-typed command token to an operation name.
///
/// `Get-Token` → `get_token`
pub fn normalize_command(token: &str) -> String {
    token.to_lowercase().replace('-', "_")
}

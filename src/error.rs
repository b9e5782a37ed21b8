//! Error types for the tf-cli crate.

use thiserror::Error;

/// Errors that escape a dispatch run.
///
/// Everything else (unknown commands, bad flags, failed selections, non-2xx
/// responses) is reported to the user and turned into an exit code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("HTTP request failed")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to read response body")]
    ResponseRead(#[source] reqwest::Error),

    #[error("failed to write output")]
    Output(#[source] std::io::Error),
}

/// Errors raised while populating the operation registry.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("operation '{name}' is already registered")]
    DuplicateOperation { name: String },

    #[error("operation '{operation}': required parameter '{param}' follows a parameter with a default")]
    InvalidParameterOrder { operation: String, param: String },

    #[error("operation '{operation}': parameter '{param}' is declared twice")]
    DuplicateParameter { operation: String, param: String },

    #[error("operation '{operation}': parameter name '{param}' is reserved")]
    ReservedParameter { operation: String, param: String },
}

/// Errors raised while turning an operation into a flag parser.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    #[error("unsupported value type '{value_type}' for parameter '{param}'")]
    UnknownFlagSyntax { param: String, value_type: String },
}

/// A `--select` path that does not resolve against the response body.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectPathError {
    #[error("no field '{segment}' at '{path}'")]
    MissingKey { path: String, segment: String },

    #[error("index '{segment}' out of range at '{path}'")]
    IndexOutOfRange { path: String, segment: String },

    #[error("cannot select '{segment}' from a scalar at '{path}'")]
    NotAContainer { path: String, segment: String },
}

/// Errors raised while resolving credentials and the API URL.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unable to retrieve ThingFabric credentials: {missing} is not set")]
    InvalidCredentials { missing: &'static str },

    #[error("failed to read config file {path}: {reason}")]
    FileRead { path: String, reason: String },
}

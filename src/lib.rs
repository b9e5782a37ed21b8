//! Turn declared REST endpoint operations into a command-line interface.
//!
//! Operations are registered with an explicit parameter list; a clap parser is
//! built per command from that list plus flag metadata, and the parsed
//! arguments are sent through a generic blocking HTTP executor.
//!
//! # Usage
//!
//! ```no_run
//! use tf_cli::{build_client, Credentials, Dispatcher, Executor, FlagMeta, MetadataTable, Operation, Registry};
//! use reqwest::Method;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(
//!         Operation::request("create_token", "auth", Method::POST, "auth/token").optional("ttl"),
//!     )
//!     .unwrap();
//!
//! let metadata = MetadataTable::new().with("ttl", FlagMeta::help_text("TTL in seconds").int());
//! let executor = Executor::new(
//!     build_client().unwrap(),
//!     "https://api.example.com/r/",
//!     Credentials::new("access", "secret"),
//! );
//!
//! let args = vec!["create-token".to_string(), "--ttl".to_string(), "60".to_string()];
//! let code = Dispatcher::new("myapi", &registry, &metadata, &executor)
//!     .run(&args, &mut std::io::stdout(), &mut std::io::stderr())
//!     .unwrap();
//! std::process::exit(code);
//! ```

pub mod builder;
pub mod config;
pub mod dispatch;
pub mod endpoints;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod request;

pub use builder::{
    build_command, flag_name, flag_specs, normalize_command, FlagSpec, OperationCommand,
};
pub use config::{Config, ConfigOverrides};
pub use dispatch::{help_listing, select_path, utf8_args, Dispatcher};
pub use error::{BuildError, ConfigError, DispatchError, RegistryError, SelectPathError};
pub use metadata::{FlagMeta, MetadataTable, ValueType};
pub use registry::{
    Action, CallArgs, Handler, Operation, ParameterDescriptor, Registry, RequestTemplate,
};
pub use request::{build_client, Credentials, Executor, RequestResult};

// Re-export dependencies for downstream crates
pub use clap;
pub use reqwest;

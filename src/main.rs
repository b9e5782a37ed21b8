//! `tf` - ThingFabric command line interface.
//!
//! Usage: `tf <command> [--flag value ...] [--select <dot.path>]`
//!
//! Environment variables:
//! - TF_ACCESS_KEY / TF_SECRET_KEY: API credentials
//! - TF_URL: API base URL
//! - RUST_LOG: log filter (default `warn`)
//!
//! Credentials and URL fall back to the `[ThingFabric]` section of `~/.tf`.
//!
//! Exit codes:
//! - 0: the remote call succeeded
//! - 1: anything else

use std::error::Error;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use tf_cli::{
    build_client, endpoints, utf8_args, Config, ConfigOverrides, Dispatcher, Executor,
};

const PROG: &str = "tf";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::resolve(ConfigOverrides::default()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let registry = match endpoints::registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let metadata = endpoints::metadata();
    let client = match build_client() {
        Ok(client) => client,
        Err(e) => {
            report(&e);
            return ExitCode::FAILURE;
        }
    };
    let executor = Executor::new(client, config.url, config.credentials);

    let args = match utf8_args(std::env::args_os().skip(1)) {
        Ok(args) => args,
        Err(arg) => {
            eprintln!("Error: argument is not valid UTF-8: {}", arg.to_string_lossy());
            return ExitCode::FAILURE;
        }
    };
    let dispatcher = Dispatcher::new(PROG, &registry, &metadata, &executor);
    match dispatcher.run(&args, &mut std::io::stdout(), &mut std::io::stderr()) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!(error = ?e, "command failed");
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &dyn Error) {
    match e.source() {
        Some(source) => eprintln!("Error: {e}: {source}"),
        None => eprintln!("Error: {e}"),
    }
}

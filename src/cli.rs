//! Command-line interface for playground-runtime.
//!
//! Uses lexopt to keep argument parsing small.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Options left unset fall through to the environment, the config file
/// and then the defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Python interpreter executable.
    pub python: Option<String>,
    /// Node.js executable.
    pub node: Option<String>,
    /// Skip pre-warming modules during initialization.
    pub no_prewarm: bool,
    /// Disable the missing-module recovery cycle.
    pub no_auto_install: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Run this file once and exit instead of serving.
    pub run: Option<PathBuf>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Long("python") => {
                result.python = Some(parser.value()?.parse()?);
            }
            Long("node") => {
                result.node = Some(parser.value()?.parse()?);
            }
            Long("no-prewarm") => {
                result.no_prewarm = true;
            }
            Long("no-auto-install") => {
                result.no_auto_install = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Short('r') | Long("run") => {
                result.run = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"playground-runtime {version}
Code execution session server for the browser playground

USAGE:
    playground-runtime [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>       Port to listen on [default: 8765]
    -c, --config <FILE>     Path to configuration file (JSON)
        --python <EXE>      Python interpreter [default: python3]
        --node <EXE>        Node.js executable [default: node]
        --no-prewarm        Do not install the pre-warm modules on startup
        --no-auto-install   Do not install missing modules automatically
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -r, --run <FILE>        Run a .py or .js file once and exit
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    PLAYGROUND_HOST         Host address (overrides config)
    PLAYGROUND_PORT         Port number (overrides config)
    PLAYGROUND_PYTHON       Python interpreter (overrides config)
    PLAYGROUND_NODE         Node.js executable (overrides config)
    PLAYGROUND_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Serve on localhost:8765 with the default pre-warm list
    playground-runtime

    # Fast startup, custom interpreter
    playground-runtime --no-prewarm --python /opt/venv/bin/python

    # Run a script once
    playground-runtime -r analysis.py
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("playground-runtime {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

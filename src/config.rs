//! Command line flags and the startup configuration built from them

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use kndu_k8s::ConnectOptions;
use kndu_poll::PollMode;
use kndu_types::DisplayOptions;

/// kndu - displays nodes with their OS, architecture and container runtime
#[derive(Parser, Debug)]
#[command(name = "kndu")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Namespace to use
    #[arg(short = 'n', long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Use all namespaces
    #[arg(short = 'A', long, env = "ALL_NAMESPACES")]
    pub all_namespaces: bool,

    /// Show allocatable and capacity cpu and memory of each node
    #[arg(short = 'r', long, env = "SHOW_REQUESTS_AND_LIMITS")]
    pub show_requests_and_limits: bool,

    /// Show the age of each node
    #[arg(short = 't', long, env = "SHOW_POD_START_TIMES")]
    pub show_pod_start_times: bool,

    /// Refresh every second so that changes can be observed
    #[arg(short = 'w', long, env = "WATCH")]
    pub watch: bool,

    /// Log level (trace, debug, info, warn, error, fatal, panic)
    #[arg(short = 'v', long, env = "VERBOSITY", default_value = "warn")]
    pub verbosity: String,

    /// Print the status conditions of each node before the table
    #[arg(long, env = "CONDITIONS")]
    pub conditions: bool,

    /// Kubeconfig file (default: $KUBECONFIG or ~/.kube/config)
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, env = "CONTEXT")]
    pub context: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid verbosity '{0}' (expected one of: trace, debug, info, warn, error, fatal, panic)")]
pub struct InvalidVerbosity(String);

/// Parse a log level name; `fatal` and `panic` map to error
pub fn parse_verbosity(name: &str) -> Result<Level, InvalidVerbosity> {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "fatal" | "panic" => Ok(Level::ERROR),
        _ => Err(InvalidVerbosity(name.to_string())),
    }
}

/// Startup configuration, fixed for the lifetime of the process
#[derive(Debug)]
pub struct Config {
    namespace: Option<String>,
    all_namespaces: bool,
    pub options: DisplayOptions,
    pub mode: PollMode,
    pub verbosity: Level,
    pub show_conditions: bool,
    pub connect: ConnectOptions,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, InvalidVerbosity> {
        let verbosity = parse_verbosity(&args.verbosity)?;

        Ok(Self {
            namespace: args.namespace.filter(|ns| !ns.is_empty()),
            all_namespaces: args.all_namespaces,
            options: DisplayOptions {
                show_namespace: args.all_namespaces,
                show_times: args.show_pod_start_times,
                show_resource_limits: args.show_requests_and_limits,
            },
            mode: if args.watch {
                PollMode::Watch
            } else {
                PollMode::Once
            },
            verbosity,
            show_conditions: args.conditions,
            connect: ConnectOptions {
                kubeconfig: args.kubeconfig,
                context: args.context,
            },
        })
    }

    /// Namespace shown in the header.
    ///
    /// `--all-namespaces` wins over `--namespace`, which wins over the
    /// namespace of the kubeconfig context.
    pub fn resolve_namespace(&self, context_default: Option<&str>) -> String {
        if self.all_namespaces {
            return String::new();
        }
        self.namespace
            .as_deref()
            .or(context_default)
            .unwrap_or_default()
            .to_string()
    }
}

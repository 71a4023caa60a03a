//! Command-line interface module

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Group Latency Harness - dispatch run groups against a recording server and reconcile both sides
#[derive(Parser, Debug, Clone)]
#[command(name = "glh")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output (info level, overrides LOG_LEVEL)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output (debug level, overrides LOG_LEVEL)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log output format: console, json or compact
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the recording server
    Server(ServerArgs),

    /// Execute a run group and write the reconciliation report
    Client(ClientArgs),

    /// Create a run group on a server and print it
    Create(CreateArgs),

    /// List the run groups known to a server
    Groups(GroupsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Port number
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Run group ID
    #[arg(short = 'g', long = "group")]
    pub group_id: Option<String>,

    /// Remote server base address
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Report file
    #[arg(short = 'f', long = "report")]
    pub report_file: Option<PathBuf>,

    /// Payload sent with every run
    #[arg(short, long)]
    pub data: Option<String>,

    /// Per-request timeout in seconds
    #[arg(short, long, value_parser = parse_timeout)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Remote server base address
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Number of runs in the group
    #[arg(short = 'n', long)]
    pub count: u32,

    /// Worker concurrency
    #[arg(short, long, default_value_t = 1)]
    pub concurrency: u32,

    /// Client pause between dispatches, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub client_delay_ms: u64,

    /// Server pause before answering, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub server_delay_ms: u64,

    /// Upstream endpoint the server calls for every run
    #[arg(long)]
    pub upstream: Option<String>,

    /// Upstream call timeout, in milliseconds
    #[arg(long, requires = "upstream")]
    pub upstream_timeout_ms: Option<u64>,

    /// Free-form description
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug, Clone)]
pub struct GroupsArgs {
    /// Remote server base address
    #[arg(short, long)]
    pub remote: Option<String>,
}

impl CreateArgs {
    /// Group descriptor sent to the server
    pub fn to_spec(&self) -> crate::models::GroupSpec {
        crate::models::GroupSpec {
            description: self.description.clone(),
            run_count: self.count,
            concurrency: self.concurrency,
            client_delay_ns: self.client_delay_ms.saturating_mul(1_000_000),
            server_delay_ns: self.server_delay_ms.saturating_mul(1_000_000),
            upstream_endpoint: self.upstream.clone(),
            upstream_timeout_ns: self.upstream_timeout_ms.map(|ms| ms.saturating_mul(1_000_000)),
        }
    }
}

/// Parse a timeout in whole seconds
fn parse_timeout(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_REQUEST_TIMEOUT_SECS {
                Err(format!(
                    "Duration cannot exceed {} seconds",
                    crate::defaults::MAX_REQUEST_TIMEOUT_SECS
                ))
            } else {
                Ok(secs)
            }
        })
}

//! Group Latency Harness - Main CLI Application
//!
//! Runs the recording server, executes run groups against it, and manages
//! groups from the command line.

use clap::Parser;
use group_latency_harness::{app::App, cli::Cli, error::AppError};
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Report without exiting: a panic inside a worker task is caught by the
    // runtime and surfaces as an execution error from the executor.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
    }));

    let cli = Cli::parse();
    let plain = cli.global.no_color || std::env::var_os("NO_COLOR").is_some();

    let app = match App::new(cli) {
        Ok(app) => app,
        Err(e) => exit_with(&e, !plain),
    };
    let use_color = !plain && app.use_color();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, shutting down...");
            on_signal.cancel();
        }
    });

    if let Err(e) = app.run(cancel).await {
        exit_with(&e, use_color);
    }
}

fn exit_with(error: &AppError, use_color: bool) -> ! {
    eprintln!("{}", error.format_for_console(use_color));
    print_error_suggestions(error);
    process::exit(error.exit_code());
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - client requires --group, --remote and --report");
            eprintln!("  - remote addresses must start with http:// or https://");
            eprintln!("  - GLH_REMOTE can be set in the environment or a .env file");
        }
        AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check that `glh server` is running at the remote address");
            eprintln!("  - Verify firewall settings");
        }
        AppError::NotFound(_) => {
            eprintln!();
            eprintln!("Create the run group first with `glh create`, then pass its id to --group.");
        }
        _ => {}
    }
}

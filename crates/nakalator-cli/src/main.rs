//! Nakalator CLI - Main entry point

use clap::Parser;
use nakalator_cli::{Cli, Commands};
use nakalator_common::logging::{init_logging, LogConfig};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A workspace .env may carry NAKALATOR_* settings; parse again so the
    // env-backed flags see them. Variables already set are kept.
    let cli = match dotenvy::from_path(cli.workspace.join(".env")) {
        Ok(()) => Cli::parse(),
        Err(_) => cli,
    };

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let log_config = LogConfig::builder()
        .verbose(cli.verbose)
        .file_prefix("nakalator")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {}", e);
            log_config
        },
    };

    // The CLI works without logging; keep the guard alive for file output
    let logging = init_logging(&log_config);
    let console_logging = logging.is_ok() && log_config.console;
    let _guard = logging.ok().flatten();

    let result = match command {
        Commands::Init { path, force } => nakalator_cli::commands::init::run(path, force)
            .await
            .map(|_| ()),
        Commands::Main(args) => {
            nakalator_cli::commands::run::run(&cli.workspace, cli.api_url.clone(), args).await
        },
    };

    if let Err(e) = result {
        if console_logging {
            error!("{}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

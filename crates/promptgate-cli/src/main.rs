//! Promptgate - pause/resume prompt editing for generative pipelines

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promptgate_core::{BrokerConfig, EditRequest, Resolution};
use promptgate_server::PromptServer;

mod commands;
mod config;

use commands::{Cli, Commands, ConfigCommands};
use config::CliConfig;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load();

    let result = match &cli.command {
        Some(Commands::Serve {
            timeout,
            max_sessions,
        }) => run_serve(&cli, &config, *timeout, *max_sessions).await,
        Some(Commands::Demo {
            text,
            node_id,
            timeout,
        }) => run_demo(&cli, &config, text, node_id, *timeout).await,
        Some(Commands::Config { command }) => run_config(command, &config),
        None => run_serve(&cli, &config, None, None).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn broker_config(
    config: &CliConfig,
    timeout: Option<u64>,
    max_sessions: Option<usize>,
) -> BrokerConfig {
    BrokerConfig {
        session_timeout_secs: timeout.unwrap_or(config.session_timeout_secs),
        max_sessions: max_sessions.unwrap_or(config.max_sessions),
        ..BrokerConfig::default()
    }
}

async fn run_serve(
    cli: &Cli,
    config: &CliConfig,
    timeout: Option<u64>,
    max_sessions: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = cli.host.clone().unwrap_or_else(|| config.host.clone());
    let port = cli.port.unwrap_or(config.port);

    let server = PromptServer::new(broker_config(config, timeout, max_sessions));
    let broker = server.broker();

    println!(
        "{} {}",
        "Starting prompt edit server on".cyan().bold(),
        format!("http://{}:{}", host, port).yellow()
    );
    println!("{}", "Press Ctrl-C to stop.".dimmed());

    let mut server_handle = tokio::spawn(async move { server.start(&host, port).await });

    tokio::select! {
        result = &mut server_handle => result??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            println!();
            println!("{}", "Shutting down, cancelling open sessions...".dimmed());
            broker.shutdown().await;
            server_handle.abort();
        }
    }

    Ok(())
}

async fn run_demo(
    cli: &Cli,
    config: &CliConfig,
    text: &str,
    node_id: &str,
    timeout: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = cli.host.clone().unwrap_or_else(|| config.host.clone());
    let port = cli.port.unwrap_or(config.port);

    let server = PromptServer::new(broker_config(config, timeout, None));
    let broker = server.broker();

    let server_task = {
        let host = host.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start(&host, port).await {
                eprintln!("{}: {}", "Server error".red().bold(), e);
                std::process::exit(1);
            }
        })
    };

    let (id, handle) = broker
        .begin_session(EditRequest::new(node_id, text))
        .await?;

    println!("{} {}", "Opened edit session:".cyan().bold(), id.yellow());
    println!();
    println!("{}", "Confirm it with:".dimmed());
    println!(
        "  curl -X POST http://{}:{}/prompt_edit/confirm -H 'content-type: application/json' \\",
        host, port
    );
    println!(
        "       -d '{{\"session_id\": \"{}\", \"edited_text\": \"your new text\"}}'",
        id
    );
    println!("{}", "or cancel it with:".dimmed());
    println!(
        "  curl -X POST http://{}:{}/prompt_edit/cancel -H 'content-type: application/json' \\",
        host, port
    );
    println!("       -d '{{\"session_id\": \"{}\"}}'", id);
    println!();
    println!("{}", "Waiting for the session to resolve...".dimmed());

    let resolution = handle.block_until_resolved().await?;
    match resolution {
        Resolution::Confirmed { text } => {
            println!("{} {}", "Confirmed:".green().bold(), text);
        }
        Resolution::Cancelled { text } => {
            println!("{} {}", "Cancelled, last text was:".yellow().bold(), text);
        }
        Resolution::Expired { text } => {
            println!("{} {}", "Expired, resuming with:".yellow().bold(), text);
        }
    }

    server_task.abort();
    Ok(())
}

fn run_config(
    command: &ConfigCommands,
    config: &CliConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
        ConfigCommands::Init => {
            let path = CliConfig::default().save()?;
            println!("{} {}", "Wrote".green().bold(), path.display());
            Ok(())
        }
    }
}

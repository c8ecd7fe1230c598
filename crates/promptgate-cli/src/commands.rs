//! CLI commands

use clap::{Parser, Subcommand};

/// Promptgate - pause/resume prompt editing for generative pipelines
#[derive(Parser, Debug)]
#[command(name = "promptgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Host to bind (defaults to the configured host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (defaults to the configured port)
    #[arg(short, long)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the edit session server (default when no command is given)
    Serve {
        /// Session timeout in seconds (0 disables expiry)
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum number of concurrently open sessions
        #[arg(long)]
        max_sessions: Option<usize>,
    },

    /// Start a server, open one edit session, and wait for it to resolve
    Demo {
        /// Text handed to the edit node
        #[arg(default_value = "a cat in a hat")]
        text: String,

        /// Node ID reported in the session
        #[arg(long, default_value = "demo_node")]
        node_id: String,

        /// Session timeout in seconds (0 disables expiry)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Write the default configuration file
    Init,
}

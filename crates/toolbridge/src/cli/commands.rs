//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Expose an execution host's tools to LLM providers.
#[derive(Parser, Debug)]
#[command(name = "toolbridge")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "TOOLBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Execution host base URL, overriding the configuration file
    #[arg(long, global = true, env = "TOOLBRIDGE_HOST_URL")]
    pub host_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the catalog converted for a provider as JSON
    Tools {
        /// Provider key (openai, anthropic, gemini, groq, ollama)
        #[arg(short, long, default_value = "openai")]
        provider: String,

        /// Print conversion failures and cache status alongside the definitions
        #[arg(long)]
        report: bool,
    },

    /// Execute one tool and print the result
    Call {
        /// Tool name (canonical or provider-native)
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Provider whose naming the tool name follows
        #[arg(short, long, default_value = "openai")]
        provider: String,
    },

    /// Check the execution host once
    Health,

    /// Load the catalog and print bridge status and executor metrics
    Metrics,

    /// Run one conversation turn with the host's tools available
    Chat {
        /// User message
        prompt: String,

        /// Provider key (openai, anthropic, groq, ollama)
        #[arg(short, long, default_value = "openai")]
        provider: String,

        /// Model identifier
        #[arg(short, long)]
        model: String,

        /// Override the provider's API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

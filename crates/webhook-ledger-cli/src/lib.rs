//! # Webhook-Ledger CLI
//!
//! Developer helpers for exercising a webhook-ledger receiver by hand:
//!
//! - `sign`: print the `X-Hub-Signature-256` value for a body
//! - `verify`: check a signature value against a body
//!
//! The body is taken from `--body`, `--file`, or standard input, and is signed
//! byte for byte. Reformatting JSON changes its signature.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;
use webhook_ledger_core::{sign, SignatureVerifier, WebhookSecret};

// ============================================================================
// CLI Structure
// ============================================================================

/// Webhook-Ledger CLI - sign and verify GitHub webhook bodies
#[derive(Parser)]
#[command(name = "webhook-ledger-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sign and verify GitHub webhook bodies")]
pub struct Cli {
    /// Logging level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the X-Hub-Signature-256 header value for a body
    Sign {
        #[command(flatten)]
        secret: SecretArg,

        #[command(flatten)]
        body: BodySource,
    },

    /// Check an X-Hub-Signature-256 header value against a body
    Verify {
        #[command(flatten)]
        secret: SecretArg,

        /// Header value to check, e.g. sha256=8aee20...
        #[arg(short, long)]
        signature: String,

        #[command(flatten)]
        body: BodySource,
    },
}

/// Shared webhook secret
#[derive(Args)]
pub struct SecretArg {
    /// Shared webhook secret
    #[arg(long = "secret", env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub value: String,
}

/// Where the request body comes from; standard input when neither is given
#[derive(Args)]
pub struct BodySource {
    /// Body given inline
    #[arg(short, long, conflicts_with = "file")]
    pub body: Option<String>,

    /// File holding the body
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl BodySource {
    /// The raw body bytes.
    pub fn read(&self) -> anyhow::Result<Vec<u8>> {
        if let Some(body) = &self.body {
            return Ok(body.as_bytes().to_vec());
        }

        if let Some(path) = &self.file {
            return std::fs::read(path)
                .with_context(|| format!("Failed to read body from {}", path.display()));
        }

        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read body from standard input")?;
        Ok(buffer)
    }
}

/// What a command printed and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a parsed command.
pub fn run(cli: &Cli) -> anyhow::Result<CommandOutput> {
    match &cli.command {
        Commands::Sign { secret, body } => {
            let body = body.read()?;
            debug!(body_bytes = body.len(), "Signing body");

            Ok(CommandOutput {
                text: sign(&WebhookSecret::new(secret.value.as_str()), &body),
                success: true,
            })
        }
        Commands::Verify {
            secret,
            signature,
            body,
        } => {
            let body = body.read()?;
            let verifier = SignatureVerifier::new(WebhookSecret::new(secret.value.as_str()));
            let valid = verifier.verify(&body, Some(signature.as_str()));

            Ok(CommandOutput {
                text: if valid { "valid" } else { "invalid" }.to_string(),
                success: valid,
            })
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

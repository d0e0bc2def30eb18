use clap::Parser;
use tracing::error;
use webhook_ledger_cli::{run, Cli};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&cli.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output.text);
            if !output.success {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("CLI error: {:#}", e);
            std::process::exit(2);
        }
    }
}

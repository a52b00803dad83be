//! mobilelink CLI entry point.

mod cli;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mobilelink_api::ApiClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.global.config.as_deref())?.with_overrides(&cli.global);
    let credentials = config.credentials()?;
    let mut client = ApiClient::new(credentials)?;

    match cli.command {
        Command::Login => {
            client.login().await?;
            println!("credentials accepted");
        }
        Command::Fetch => match client.fetch_device_data().await? {
            Some(items) => println!("{}", output::render_items(cli.global.output, &items)?),
            None => println!("no generators returned"),
        },
        Command::Dump => {
            let dump = client.dump_properties().await?;
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }
    Ok(())
}

mod cli;

use tracing::debug;
use tracing_subscriber::EnvFilter;
use virt_inventory::{snapshot, Inventory, RemoteConnector};

use cli::CommandLine;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    init_logging();

    let inventory = match commands.host {
        Some(host) => {
            // clap rejects --list together with --host.
            debug!(host = %host, "host vars are carried by the groups");
            Inventory::new()
        }
        None => {
            debug!(explicit = commands.list, uri = %commands.uri, "listing inventory");
            let connector = RemoteConnector::new(commands.uri);
            snapshot::generate(&connector, &commands.user).await?
        }
    };

    println!("{}", inventory.to_json()?);
    Ok(())
}

/// Logs go to stderr; stdout carries only the inventory.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

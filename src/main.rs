mod cli;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bus_indexer=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let args = &cli.bus;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Index {
            path,
            order,
            no_progress,
        } => {
            cli::build_index(&path, args, order.into(), cli.format, !no_progress, cancel).await?;
        }
        Commands::Counterparts {
            file,
            line,
            column,
            root,
        } => {
            cli::find_counterparts(&root, args, &file, line, column, cli.format)?;
        }
        Commands::Markers { file, root } => {
            cli::list_markers(&root, args, &file, cli.format)?;
        }
    }

    Ok(())
}

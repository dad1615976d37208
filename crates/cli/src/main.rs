use crate::{
    commands::{Commands, DumpArgs},
    conn::{ConnectionPinger, PooledConnectionPinger},
    error::CliError,
    output::RecordWriter,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::source::{
    config::{DataSourceConfig, PoolConfig},
    pool::PooledDataSourceProvider,
};
use engine_core::channel::record_channel;
use engine_processing::dumper::InventoryDumper;
use model::{core::identifiers::SourceDialect, execution::state::DumpState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "dumper",
    version = "0.1.0",
    about = "Inventory dump of MySQL and PostgreSQL tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Records go to stdout, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump(args) => {
            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            let state = dump(args, &shutdown).await?;
            let code = ExitCode::for_state(state);
            if code != ExitCode::Success {
                std::process::exit(code.as_i32());
            }
        }
        Commands::TestConn { format, conn_str } => {
            let dialect: SourceDialect = format
                .parse()
                .map_err(|_| CliError::InvalidConnectionFormat(format.clone()))?;
            PooledConnectionPinger::new(dialect, conn_str).ping().await?;
        }
    }

    Ok(())
}

async fn dump(args: DumpArgs, shutdown: &ShutdownCoordinator) -> Result<DumpState, CliError> {
    let config = args.task_config().await?;
    info!(
        table = %config.table,
        dialect = %config.dialect,
        columns = config.columns.len(),
        key = ?config.unique_key,
        "Starting dump"
    );

    let provider = Arc::new(
        PooledDataSourceProvider::new(PoolConfig {
            max_connections: args.max_connections,
        })
        .with_source(
            config.source.clone(),
            DataSourceConfig::new(config.dialect, args.url.clone()),
        ),
    );

    let (sender, mut receiver) = record_channel(args.capacity);
    let mut writer = RecordWriter::open(args.output.as_deref()).await?;
    let (handle, task) = InventoryDumper::for_source(config, provider.clone(), sender).spawn();
    let stopper = shutdown.stop_on_shutdown(handle.clone());

    let mut written = Ok(());
    while let Some(item) = receiver.pop().await {
        written = writer.write(&item).await;
        if written.is_err() {
            break;
        }
    }
    if written.is_ok() {
        written = writer.flush().await;
    }
    if written.is_err() {
        warn!("Output failed, stopping dump");
        handle.stop();
    }

    receiver.close();
    let state = task.await?;
    stopper.abort();
    provider.close().await;
    written?;

    let progress = handle.progress();
    if shutdown.is_shutdown_requested() {
        info!("Dump interrupted by shutdown request");
    }
    info!(
        state = %state,
        records = progress.records_emitted,
        bytes = progress.bytes_emitted,
        last_position = ?progress.last_position,
        "Dump complete"
    );
    let summary = serde_json::to_string(&progress).map_err(CliError::JsonSerialize)?;
    eprintln!("{summary}");

    Ok(state)
}

//! `relayer`: the CLI binary wiring configuration, logging, persistence, and
//! the Relayer Supervisor together (spec 4.6, section 6).

use std::sync::Arc;

use clap::Parser;
use relayer_core::{
    cli::{parse_gas_price, resolve_mnemonic, Cli, Command},
    store::Store,
    supervisor::Supervisor,
};
use relayer_primitives::{config::Config, relay_path::ChainFees};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Stdout plus the two file sinks from section 6 (`ERROR_LOG_FILE` carries
/// only `ERROR`-level records, `COMBINED_LOG_FILE` carries everything at the
/// configured `LOG_LEVEL`). Guards must stay alive for the process lifetime
/// or the non-blocking writers silently stop flushing.
fn init_logging(config: &Config) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    let mut guards = Vec::new();

    let (combined_writer, combined_guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(".", &config.combined_log_file));
    guards.push(combined_guard);
    let combined_layer = fmt::layer().with_writer(combined_writer).with_ansi(false);

    let (error_writer, error_guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(".", &config.error_log_file));
    guards.push(error_guard);
    let error_layer = fmt::layer().with_writer(error_writer).with_ansi(false).with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

    let env_filter = EnvFilter::try_new(config.log_level.as_filter_str()).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(combined_layer)
        .with(error_layer)
        .init();

    guards
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env();
    let _log_guards = init_logging(&config);

    let cli = Cli::parse();
    let store = Store::open(&config.db_file)?;

    match cli.command {
        Command::AddMnemonic { chain_id, mnemonic } => {
            let mnemonic = resolve_mnemonic(mnemonic)?;
            store.put_mnemonic(&chain_id, &mnemonic)?;
            println!("stored mnemonic for {chain_id}");
        }
        Command::AddGasPrice { chain_id, price } => {
            let (gas_price, gas_denom) = parse_gas_price(&price)?;
            store.put_chain_fees(&ChainFees { chain_id: chain_id.clone(), gas_price, gas_denom })?;
            println!("stored gas price for {chain_id}");
        }
        Command::AddPath {
            source,
            source_url,
            destination,
            destination_url,
            source_type,
            destination_type,
            ibc_version,
            client_a,
            client_b,
        } => {
            let supervisor = Supervisor::new(config.clone(), store)?;
            let path = supervisor.add_path(
                source,
                source_url,
                source_type,
                destination,
                destination_url,
                destination_type,
                ibc_version,
                client_a,
                client_b,
            )?;
            println!("{}", serde_json::to_string_pretty(&path)?);
        }
        Command::Relay => {
            let supervisor = Arc::new(Supervisor::new(config.clone(), store)?);
            supervisor.init().await?;
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            supervisor.clone().start(shutdown_rx).await;
            tokio::signal::ctrl_c().await?;
            let _ = shutdown_tx.send(true);
            supervisor.stop().await?;
        }
        Command::DumpPaths => {
            println!("{}", serde_json::to_string_pretty(&store.list_paths()?)?);
        }
    }

    Ok(())
}

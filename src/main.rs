use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokenauth::config::Configuration;
use tokenauth::error::ServerError;
use tokenauth::key::{DEFAULT_KEY_BITS, KeyPair};
use tokenauth::{app, initialize_state, telemetry};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Path to the YAML configuration file.
        #[clap(long, short)]
        config: Option<PathBuf>,
    },
    /// Generate a signing key and store it as JSON parameters.
    Keygen {
        /// Destination file. Never overwritten.
        #[clap(long, short)]
        output: PathBuf,
        /// Modulus length.
        #[clap(long, short, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::setup_logging();

    let args = Args::parse();
    let result = match args.cmd.unwrap_or(Commands::Serve { config: None }) {
        Commands::Serve { config } => serve(config).await,
        Commands::Keygen { output, bits } => keygen(output, bits),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "exiting");
            ExitCode::FAILURE
        },
    }
}

async fn serve(path: Option<PathBuf>) -> Result<(), ServerError> {
    let metrics = telemetry::setup_metrics_recorder().map_err(|err| {
        ServerError::Internal {
            details: "cannot install metrics recorder".into(),
            source: Some(Box::new(err)),
        }
    })?;

    let config = Configuration::default()
        .path(path.unwrap_or_default())
        .read()?;
    let address = config.address.clone();
    let state = initialize_state(config, Some(metrics)).await?;

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "server started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn keygen(output: PathBuf, bits: usize) -> Result<(), ServerError> {
    let keys = KeyPair::generate(bits)?;
    keys.write_parameters(&output)?;

    tracing::info!(
        path = %output.display(),
        modulus = keys.public_key().modulus(),
        "signing key written"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

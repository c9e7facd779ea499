pub mod api; // JSON HTTP API
pub mod assessment;
pub mod auth;
pub mod config;
pub mod core_state;
pub mod features;
pub mod history; // CSV prediction history
pub mod i18n;
pub mod model; // Classifier + attribution adapters
pub mod session;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli};
use crate::core_state::{CoreState, StartupError};
use crate::i18n::{Catalog, Locale};

pub fn run() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = AppConfig::from(Cli::parse());

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Cannot start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_with_config(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.message_key() {
                Some(key) => tracing::error!("{}: {e}", Catalog::builtin().text(Locale::En, key)),
                None => tracing::error!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Load artifacts, start the server and serve until Ctrl-C.
pub async fn run_with_config(config: AppConfig) -> Result<(), StartupError> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        model = %config.model_path.display(),
        explainer = %config.explainer_path.display(),
        history = %config.history_path.display(),
        "Configuration resolved"
    );

    let core = Arc::new(CoreState::from_config(&config)?);
    let mut server = api::start_api_server(core, config.listen_addr).await?;
    tracing::info!(addr = %server.info.server_addr, "Listening");

    tokio::select! {
        result = server.wait() => return result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!("Cannot listen for Ctrl-C: {e}");
            }
        }
    }

    server.shutdown();
    server.wait().await
}

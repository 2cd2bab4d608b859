use std::sync::{Arc, Mutex};

use tracing::error;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::{LLMClient, OpenAIClient};
use crate::infrastructure::storage::ensure_dir;
use crate::interfaces::http::{add_log, start_server, LogEntry};
use crate::interfaces::AppState;

/// Prepare directories and wire the use cases around one engine client.
pub fn build_state(config: AppConfig, logs: Arc<Mutex<Vec<LogEntry>>>) -> Result<Arc<AppState>> {
    for dir in [&config.storage.data_dir, &config.storage.storage_root] {
        ensure_dir(dir).map_err(|err| {
            error!(error = %err, dir = %dir.display(), "Failed to create directory");
            AppError::IoError(format!("{}: {}", dir.display(), err))
        })?;
    }

    let llm_client: Arc<dyn LLMClient + Send + Sync> =
        Arc::new(OpenAIClient::new(config.llm.request_timeout_secs));

    add_log(
        &logs,
        "INFO",
        "System",
        &format!(
            "Using model {} at {}, uploads in {}",
            config.llm.model,
            config.llm.base_url,
            config.storage.data_dir.display()
        ),
    );

    Ok(Arc::new(AppState::new(config, llm_client, logs)))
}

pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));
    let address = format!("{}:{}", config.server.host, config.server.port);

    let state = build_state(config, logs.clone())
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    let server = start_server(state, logs.clone()).map_err(|err| {
        error!(error = %err, address = %address, "Failed to start HTTP server");
        err
    })?;

    add_log(
        &logs,
        "INFO",
        "System",
        &format!("Backend initialized and HTTP server started on {}", address),
    );
    tracing::info!(address = %address, "HTTP server started");

    server.await
}

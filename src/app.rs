use tracing_subscriber::EnvFilter;

use crate::infrastructure::bootstrap;
use crate::infrastructure::config::AppConfig;

pub async fn run() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    bootstrap::serve(config).await
}

//! Pushgate - push notification dispatch server.

use color_eyre::eyre::WrapErr as _;
use push_server::config::{Config, StorageKind};

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("pushgate starting");

    let config = Config::load(std::env::args().nth(1)).wrap_err("failed to load config")?;

    match config.database.kind() {
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage, nothing survives a restart");
            let storage = push_storage::MemoryStorage::new();
            push_server::run(config, storage, push_server::shutdown_signal()).await
        }
        StorageKind::Sqlite(url) => {
            let storage = push_storage::SqliteStorage::new(&url)
                .wrap_err("failed to initialize storage")?;

            storage
                .run_migrations()
                .wrap_err("failed to run migrations")?;

            push_server::run(config, storage, push_server::shutdown_signal()).await
        }
    }
}

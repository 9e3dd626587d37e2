use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("ledger error: {0}")]
    Engine(#[from] engine::EngineError),
    #[error("sync error: {0}")]
    Sync(#[from] wallet_sync::SyncError),
    #[error("wallet store error: {0}")]
    Remote(#[from] wallet_sync::RemoteError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing [{0}] section in the configuration")]
    MissingSection(&'static str),
    #[error("nothing to run: configure [server] and/or [device]")]
    NothingToRun,
}

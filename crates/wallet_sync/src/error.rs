use engine::EngineError;
use thiserror::Error;

/// Failures of the wallet store client, before they are given a meaning
/// for the wallet at hand.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("wallet not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("invalid remote url: {0}")]
    Url(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync is not enabled")]
    SyncDisabled,
    #[error("wallet password not available in this session")]
    CredentialMissing,
    #[error("wallet {0} already exists")]
    WalletAlreadyExists(String),
    #[error("wallet {0} not found")]
    WalletNotFound(String),
    #[error("invalid wallet password")]
    InvalidCredential,
    #[error("wallet store unreachable: {0}")]
    Transport(String),
    #[error("wallet store error: {0}")]
    Remote(String),
    #[error(transparent)]
    Store(#[from] EngineError),
    #[error("sync settings: {0}")]
    Settings(String),
}

impl SyncError {
    /// Nothing to retry: the device is not set up to sync.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::SyncDisabled | Self::CredentialMissing)
    }

    /// The wallet id or its password was refused.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::WalletNotFound(_) | Self::InvalidCredential)
    }

    pub(crate) fn from_remote(err: RemoteError, wallet_id: &str) -> Self {
        match err {
            RemoteError::NotFound => Self::WalletNotFound(wallet_id.to_string()),
            RemoteError::Unauthorized => Self::InvalidCredential,
            RemoteError::Conflict(_) => Self::WalletAlreadyExists(wallet_id.to_string()),
            RemoteError::Server { status, message } => {
                Self::Remote(format!("{status}: {message}"))
            }
            RemoteError::Url(url) => Self::Settings(format!("invalid remote url {url}")),
            RemoteError::Transport(err) => Self::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_statuses_map_to_wallet_errors() {
        let not_found = SyncError::from_remote(RemoteError::NotFound, "w1");
        assert!(matches!(&not_found, SyncError::WalletNotFound(id) if id == "w1"));
        assert!(not_found.is_authentication());
        assert!(SyncError::from_remote(RemoteError::Unauthorized, "w1").is_authentication());
        assert!(matches!(
            SyncError::from_remote(RemoteError::Conflict("taken".to_string()), "w1"),
            SyncError::WalletAlreadyExists(_)
        ));
    }

    #[test]
    fn only_missing_setup_is_configuration() {
        assert!(SyncError::SyncDisabled.is_configuration());
        assert!(SyncError::CredentialMissing.is_configuration());
        assert!(!SyncError::InvalidCredential.is_configuration());
        assert!(!SyncError::Transport("down".to_string()).is_configuration());
    }
}

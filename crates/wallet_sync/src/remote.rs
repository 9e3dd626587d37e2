//! Client side of the wallet store.

use api_types::wallet::{ErrorResponse, Snapshot, WalletCreated, WalletDeleted, WalletReplaced};
use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::RemoteError;

/// The four wallet operations. The password authenticates every call.
#[async_trait]
pub trait WalletRemote: Send + Sync {
    async fn create(
        &self,
        wallet_id: &str,
        password: &str,
        snapshot: &Snapshot,
    ) -> Result<WalletCreated, RemoteError>;

    /// The stored document as-is; decoding is up to the caller.
    async fn fetch(&self, wallet_id: &str, password: &str) -> Result<Value, RemoteError>;

    async fn replace(
        &self,
        wallet_id: &str,
        password: &str,
        snapshot: &Snapshot,
    ) -> Result<WalletReplaced, RemoteError>;

    async fn delete(&self, wallet_id: &str, password: &str) -> Result<WalletDeleted, RemoteError>;
}

#[derive(Debug, Clone)]
pub struct HttpWalletRemote {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpWalletRemote {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base_url =
            Url::parse(base_url).map_err(|err| RemoteError::Url(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Url(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, wallet_id: &str) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "wallet", wallet_id]);
        Ok(url)
    }
}

async fn parse<T: DeserializeOwned>(res: Response) -> Result<T, RemoteError> {
    if res.status().is_success() {
        return res.json::<T>().await.map_err(RemoteError::Transport);
    }

    let status = res.status();
    let body = res
        .json::<ErrorResponse>()
        .await
        .map(|err| err.error)
        .unwrap_or_else(|_| "unknown error".to_string());

    let err = match status.as_u16() {
        401 => RemoteError::Unauthorized,
        404 => RemoteError::NotFound,
        409 => RemoteError::Conflict(body),
        code => RemoteError::Server {
            status: code,
            message: body,
        },
    };
    Err(err)
}

#[async_trait]
impl WalletRemote for HttpWalletRemote {
    async fn create(
        &self,
        wallet_id: &str,
        password: &str,
        snapshot: &Snapshot,
    ) -> Result<WalletCreated, RemoteError> {
        let res = self
            .http
            .post(self.endpoint(wallet_id)?)
            .bearer_auth(password)
            .json(snapshot)
            .send()
            .await?;
        parse(res).await
    }

    async fn fetch(&self, wallet_id: &str, password: &str) -> Result<Value, RemoteError> {
        let res = self
            .http
            .get(self.endpoint(wallet_id)?)
            .bearer_auth(password)
            .send()
            .await?;
        parse(res).await
    }

    async fn replace(
        &self,
        wallet_id: &str,
        password: &str,
        snapshot: &Snapshot,
    ) -> Result<WalletReplaced, RemoteError> {
        let res = self
            .http
            .put(self.endpoint(wallet_id)?)
            .bearer_auth(password)
            .json(snapshot)
            .send()
            .await?;
        parse(res).await
    }

    async fn delete(&self, wallet_id: &str, password: &str) -> Result<WalletDeleted, RemoteError> {
        let res = self
            .http
            .delete(self.endpoint(wallet_id)?)
            .bearer_auth(password)
            .send()
            .await?;
        parse(res).await
    }
}

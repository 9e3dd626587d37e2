use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use sea_orm::DatabaseConnection;

use std::{fmt, net::SocketAddr};

use crate::{ServerError, wallets};

/// Snapshots carry a whole ledger.
const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
}

/// The plaintext wallet password carried by the bearer header.
#[derive(Clone)]
pub(crate) struct Credential(pub(crate) String);

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(**)")
    }
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(ServerError::Unauthorized);
    };
    if bearer.token().is_empty() {
        return Err(ServerError::Unauthorized);
    }

    request
        .extensions_mut()
        .insert(Credential(bearer.token().to_string()));
    Ok(next.run(request).await)
}

/// The HTTP surface of the wallet store.
pub fn app(db: DatabaseConnection) -> Router {
    let state = ServerState { db };
    Router::new()
        .route(
            "/api/wallet/{wallet_id}",
            post(wallets::create)
                .get(wallets::fetch)
                .put(wallets::replace)
                .delete(wallets::delete),
        )
        .route_layer(middleware::from_fn(auth))
        .route("/api/health", get(wallets::health))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
        .with_state(state)
}

pub async fn run(db: DatabaseConnection, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(db)).await
}

pub fn spawn_with_listener(
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

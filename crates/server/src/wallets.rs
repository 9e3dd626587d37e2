//! Wallet document endpoints.
//!
//! The store never looks inside a document beyond stamping its
//! `createdAt`/`updatedAt`: it only relays the last pushed snapshot.

use api_types::wallet::{Health, WalletCreated, WalletDeleted, WalletReplaced};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, SqlErr, entity::prelude::*};
use serde_json::{Map, Value};

use crate::{
    ServerError, blobs, password,
    server::{Credential, ServerState},
};

fn into_document(body: Value) -> Result<Map<String, Value>, ServerError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ServerError::BadRequest(
            "wallet document must be a JSON object".to_string(),
        )),
    }
}

fn stamp(
    mut document: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<String, ServerError> {
    document.insert("createdAt".to_string(), Value::String(created_at.to_rfc3339()));
    document.insert("updatedAt".to_string(), Value::String(updated_at.to_rfc3339()));
    serde_json::to_string(&document).map_err(|err| ServerError::BadRequest(err.to_string()))
}

async fn hash(password: String) -> Result<String, ServerError> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|err| ServerError::Hash(err.to_string()))?
        .map_err(ServerError::Hash)
}

/// Load a wallet and check the caller's password against it.
async fn authorize(
    state: &ServerState,
    wallet_id: &str,
    credential: Credential,
) -> Result<blobs::Model, ServerError> {
    let model = blobs::Entity::find_by_id(wallet_id.to_string())
        .one(&state.db)
        .await?
        .ok_or_else(|| ServerError::NotFound("Wallet not found".to_string()))?;

    let stored = model.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || {
        password::verify_password(&credential.0, &stored)
    })
    .await
    .map_err(|err| ServerError::Hash(err.to_string()))?
    .map_err(ServerError::Hash)?;
    if !valid {
        tracing::info!(wallet_id = %wallet_id, "wallet access with a wrong password");
        return Err(ServerError::Unauthorized);
    }
    Ok(model)
}

pub async fn create(
    Path(wallet_id): Path<String>,
    Extension(credential): Extension<Credential>,
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<WalletCreated>), ServerError> {
    let document = into_document(body)?;
    if blobs::Entity::find_by_id(wallet_id.clone())
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(ServerError::Conflict("Wallet already exists".to_string()));
    }

    let now = Utc::now();
    let model = blobs::ActiveModel {
        id: ActiveValue::Set(wallet_id.clone()),
        password_hash: ActiveValue::Set(hash(credential.0).await?),
        document: ActiveValue::Set(stamp(document, now, now)?),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };
    // a concurrent create can win between the lookup and the insert
    model.insert(&state.db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServerError::Conflict("Wallet already exists".to_string())
        }
        _ => ServerError::Database(err),
    })?;
    tracing::info!(wallet_id = %wallet_id, "wallet created");

    Ok((
        StatusCode::CREATED,
        Json(WalletCreated {
            wallet_id,
            created_at: now,
        }),
    ))
}

pub async fn fetch(
    Path(wallet_id): Path<String>,
    Extension(credential): Extension<Credential>,
    State(state): State<ServerState>,
) -> Result<Json<Value>, ServerError> {
    let model = authorize(&state, &wallet_id, credential).await?;
    let document: Value = serde_json::from_str(&model.document).map_err(|err| {
        ServerError::Database(DbErr::Custom(format!("corrupt wallet document: {err}")))
    })?;
    Ok(Json(document))
}

/// Replace the whole document. The original `createdAt` is kept.
pub async fn replace(
    Path(wallet_id): Path<String>,
    Extension(credential): Extension<Credential>,
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Result<Json<WalletReplaced>, ServerError> {
    let document = into_document(body)?;
    let model = authorize(&state, &wallet_id, credential).await?;

    let now = Utc::now();
    let created_at = model.created_at;
    let mut active: blobs::ActiveModel = model.into();
    active.document = ActiveValue::Set(stamp(document, created_at, now)?);
    active.updated_at = ActiveValue::Set(now);
    active.update(&state.db).await?;
    tracing::debug!(wallet_id = %wallet_id, "wallet replaced");

    Ok(Json(WalletReplaced { updated_at: now }))
}

pub async fn delete(
    Path(wallet_id): Path<String>,
    Extension(credential): Extension<Credential>,
    State(state): State<ServerState>,
) -> Result<Json<WalletDeleted>, ServerError> {
    authorize(&state, &wallet_id, credential).await?;
    blobs::Entity::delete_by_id(wallet_id.clone())
        .exec(&state.db)
        .await?;
    tracing::info!(wallet_id = %wallet_id, "wallet deleted");

    Ok(Json(WalletDeleted { wallet_id }))
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

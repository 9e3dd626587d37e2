//! Remote wallet store: one password-protected JSON document per wallet id.

use api_types::wallet::ErrorResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use sea_orm::DbErr;

pub use server::{app, run, run_with_listener, spawn_with_listener};

mod blobs;
mod password;
mod server;
mod wallets;

#[derive(Debug)]
pub enum ServerError {
    NotFound(String),
    Unauthorized,
    Conflict(String),
    BadRequest(String),
    Hash(String),
    Database(DbErr),
}

fn status_for_error(err: &ServerError) -> StatusCode {
    match err {
        ServerError::NotFound(_) => StatusCode::NOT_FOUND,
        ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServerError::Conflict(_) => StatusCode::CONFLICT,
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Hash(_) | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_error(err: ServerError) -> String {
    match err {
        ServerError::NotFound(message)
        | ServerError::Conflict(message)
        | ServerError::BadRequest(message) => message,
        ServerError::Unauthorized => "Unauthorized".to_string(),
        ServerError::Hash(message) => {
            tracing::error!("password hashing error: {message}");
            "internal server error".to_string()
        }
        ServerError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = status_for_error(&self);
        let error = message_for_error(self);

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<DbErr> for ServerError {
    fn from(value: DbErr) -> Self {
        Self::Database(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let res = ServerError::NotFound("x".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let res = ServerError::Unauthorized.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn conflict_maps_to_409() {
        let res = ServerError::Conflict("x".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let res = ServerError::BadRequest("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_error_is_masked() {
        let err = ServerError::from(DbErr::Custom("disk on fire".to_string()));
        assert_eq!(message_for_error(err), "internal server error");
    }
}

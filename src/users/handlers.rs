use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    state::AppState,
    users::{
        repo_types::User,
        services::{self, ApiError, Reply},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::PersistenceFailure { operation, detail } => {
                error!(?operation, error = %detail, "user store call failed");
            }
            other => warn!(error = %other, "user request rejected"),
        }
        (self.status(), Json(self.body())).into_response()
    }
}

/// Raw `:id` segment. A segment axum cannot decode is an invalid id, not a
/// framework rejection.
fn raw_id(path: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            debug!(error = %rejection, "undecodable user id");
            Err(ApiError::InvalidIdentifier)
        }
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Reply<User>, ApiError> {
    services::create_user(state.users.as_ref(), &body).await
}

pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Reply<User>, ApiError> {
    services::get_user(state.users.as_ref(), &raw_id(path)?).await
}

pub async fn list_users(State(state): State<AppState>) -> Result<Reply<Vec<User>>, ApiError> {
    services::list_users(state.users.as_ref()).await
}

pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Reply<User>, ApiError> {
    services::update_user(state.users.as_ref(), &raw_id(path)?, &body).await
}

pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Reply<()>, ApiError> {
    services::delete_user(state.users.as_ref(), &raw_id(path)?).await
}

//! Validation and execution of the five user operations.
//!
//! Every entry point runs at most one store call and resolves its outcome
//! into either a [`Reply`] or an [`ApiError`]; nothing here knows about the
//! HTTP framework that carries the result.

use http::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::users::{
    dto::{ErrorBody, UserRequest},
    repo::{StoreError, UserStore},
    repo_types::User,
};

/// Which store call failed; selects the generic 500 message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    List,
    Update,
    Delete,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Self::Create => "Failed to create user",
            Self::Get => "Failed to retrieve user",
            Self::List => "Failed to retrieve users",
            Self::Update => "Failed to update user",
            Self::Delete => "Failed to delete user",
        }
    }
}

/// Every way a user request can fail. `Display` is the client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Invalid user ID")]
    InvalidIdentifier,
    #[error("Invalid request payload")]
    InvalidPayload,
    #[error("User with this email already exists")]
    ConstraintViolation,
    #[error("User not found")]
    NotFound,
    #[error("{}", .operation.failure_message())]
    PersistenceFailure { operation: Operation, detail: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidIdentifier | Self::InvalidPayload | Self::ConstraintViolation => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PersistenceFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }

    /// Maps a store failure for `operation`. Create and update care about
    /// constraint violations; get, update and delete care about missing
    /// rows. Anything else is an opaque persistence failure.
    pub fn from_store(operation: Operation, err: StoreError) -> Self {
        use Operation::*;
        match (operation, err) {
            (Create | Update, StoreError::ConstraintViolation) => Self::ConstraintViolation,
            (Get | Update | Delete, StoreError::NotFound) => Self::NotFound,
            (operation, err) => Self::PersistenceFailure {
                operation,
                detail: err.to_string(),
            },
        }
    }
}

/// Successful outcome: a status and, except for 204, a body.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub body: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }
}

/// Parses a `:id` path segment as a non-negative integer.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(ApiError::InvalidIdentifier),
    }
}

/// Deserializes a create/update body. Only shape and types are checked;
/// an empty body binds as an empty request.
pub fn parse_body(raw: &[u8]) -> Result<UserRequest, ApiError> {
    if raw.is_empty() {
        return Ok(UserRequest::default());
    }
    serde_json::from_slice(raw).map_err(|_| ApiError::InvalidPayload)
}

#[instrument(skip(store, body))]
pub async fn create_user(store: &dyn UserStore, body: &[u8]) -> Result<Reply<User>, ApiError> {
    let fields = parse_body(body)?;
    let user = store
        .create(&fields)
        .await
        .map_err(|e| ApiError::from_store(Operation::Create, e))?;
    debug!(user_id = user.id, "user created");
    Ok(Reply::created(user))
}

#[instrument(skip(store))]
pub async fn get_user(store: &dyn UserStore, raw_id: &str) -> Result<Reply<User>, ApiError> {
    let id = parse_id(raw_id)?;
    let user = store
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::from_store(Operation::Get, e))?;
    Ok(Reply::ok(user))
}

#[instrument(skip(store))]
pub async fn list_users(store: &dyn UserStore) -> Result<Reply<Vec<User>>, ApiError> {
    let users = store
        .get_all()
        .await
        .map_err(|e| ApiError::from_store(Operation::List, e))?;
    debug!(count = users.len(), "users listed");
    Ok(Reply::ok(users))
}

#[instrument(skip(store, body))]
pub async fn update_user(
    store: &dyn UserStore,
    raw_id: &str,
    body: &[u8],
) -> Result<Reply<User>, ApiError> {
    let id = parse_id(raw_id)?;
    let fields = parse_body(body)?;
    let user = store
        .update_by_id(id, &fields)
        .await
        .map_err(|e| ApiError::from_store(Operation::Update, e))?;
    debug!(user_id = user.id, "user updated");
    Ok(Reply::ok(user))
}

#[instrument(skip(store))]
pub async fn delete_user(store: &dyn UserStore, raw_id: &str) -> Result<Reply<()>, ApiError> {
    let id = parse_id(raw_id)?;
    store
        .delete_by_id(id)
        .await
        .map_err(|e| ApiError::from_store(Operation::Delete, e))?;
    debug!(user_id = id, "user deleted");
    Ok(Reply::no_content())
}

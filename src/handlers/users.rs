//! User route handlers.
//!
//! These are terminal handlers: they run only after every pipeline handler
//! has delegated, so the body has passed its schema and the caller's role
//! has been checked.
//!
//! - POST /users - Create a user
//! - GET /users - List users
//! - GET /users/{id} - Get a user
//! - DELETE /users/{id} - Delete a user

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, PipelineError};
use crate::models::user::CreateUserRequest;
use crate::pipeline::{Request, Response};
use crate::services::user_service::UserStore;

/// Create a user.
///
/// # Response (201)
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "a@b.com",
///   "name": "Al",
///   "age": 25,
///   "created_by": "u-1",
///   "created_at": "2025-12-20T10:00:00Z"
/// }
/// ```
pub async fn create_user(store: Arc<UserStore>, request: Request) -> Result<Response, PipelineError> {
    let payload: CreateUserRequest = match serde_json::from_value(request.body().clone()) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(request_id = %request.id(), error = %e, "User payload did not deserialize");
            return Ok(AppError::InvalidRequest("Invalid user payload".to_string()).into());
        }
    };

    let created_by = request.identity().map(|identity| identity.id.clone());
    let user = store.create(payload, created_by).await;
    tracing::info!(request_id = %request.id(), user_id = %user.id, "User created");

    Ok(Response::created(to_json(&user)?))
}

/// List users, newest first.
pub async fn list_users(store: Arc<UserStore>, _request: Request) -> Result<Response, PipelineError> {
    let users = store.list().await;
    Ok(Response::ok(to_json(&users)?))
}

/// Get one user. Ids that are not UUIDs are simply not found.
pub async fn get_user(store: Arc<UserStore>, request: Request) -> Result<Response, PipelineError> {
    let Some(id) = user_id(&request) else {
        return Ok(AppError::UserNotFound.into());
    };

    match store.get(id).await {
        Some(user) => Ok(Response::ok(to_json(&user)?)),
        None => Ok(AppError::UserNotFound.into()),
    }
}

/// Delete one user. Returns 204 No Content on success.
pub async fn delete_user(store: Arc<UserStore>, request: Request) -> Result<Response, PipelineError> {
    let Some(id) = user_id(&request) else {
        return Ok(AppError::UserNotFound.into());
    };

    if !store.delete(id).await {
        return Ok(AppError::UserNotFound.into());
    }

    tracing::info!(request_id = %request.id(), user_id = %id, "User deleted");
    Ok(Response::no_content())
}

fn user_id(request: &Request) -> Option<Uuid> {
    request.param("id")?.parse().ok()
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, PipelineError> {
    serde_json::to_value(value).map_err(|e| PipelineError::from(anyhow::Error::from(e)))
}

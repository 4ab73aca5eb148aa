use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Json;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct AccessPayload {
    user: User,
    access: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, AppError> {
    let (user, access) =
        auth::register(state.store.as_ref(), &credentials.username, &credentials.password).await?;
    Ok(created(AccessPayload { user, access }, "Account created"))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, AppError> {
    let (user, access) =
        auth::login(state.store.as_ref(), &credentials.username, &credentials.password).await?;
    Ok(success(AccessPayload { user, access }, "Login successful"))
}

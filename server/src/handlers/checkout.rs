use axum::extract::State;
use axum::response::Response;

use crate::auth::AuthUser;
use crate::booking::{self, CheckoutRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Json;
use crate::utils::response::created;

pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response, AppError> {
    let receipt = booking::checkout(
        state.store.as_ref(),
        state.payments.as_ref(),
        &user,
        request,
    )
    .await?;
    Ok(created(receipt, "Payment successful, reservation created"))
}

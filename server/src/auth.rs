//! Bearer-token identity.
//!
//! Tokens are opaque strings mapped to a user by the store; nothing about
//! their format is interpreted here. Passwords are only ever stored as Argon2
//! hashes and are exchanged for a fresh token at login.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::models::User;
use crate::state::AppState;
use crate::store::TicketStore;
use crate::utils::error::AppError;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// The authenticated caller. Rejects the request with 401 when the bearer
/// token is missing or unknown.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn require_staff(&self) -> Result<&User, AppError> {
        if !self.0.is_staff {
            return Err(AppError::Forbidden(
                "Only staff members can perform this action".to_string(),
            ));
        }
        Ok(&self.0)
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!(uri = %parts.uri, "Missing authorization header");
                AppError::AuthError("Authentication credentials were not provided".to_string())
            })?;
        let token = bearer_token(header)
            .ok_or_else(|| AppError::AuthError("Invalid authorization header".to_string()))?;

        let user = state.store.find_user_by_token(token).await?.ok_or_else(|| {
            tracing::warn!(uri = %parts.uri, "Rejected unknown bearer token");
            AppError::AuthError("Invalid or expired token".to_string())
        })?;

        let user = AuthUser(user);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::ValidationError(format!(
            "Username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::ValidationError(
            "Username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(format!("Password hash error: {e}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Creates a regular user and hands back its access token.
pub async fn register(
    store: &dyn TicketStore,
    username: &str,
    password: &str,
) -> Result<(User, String), AppError> {
    let username = username.trim();
    validate_username(username)?;
    validate_password(password)?;

    let user = User::new(username, false).with_password_hash(hash_password(password)?);
    let token = issue_token();
    store.insert_user(&user, &token).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok((user, token))
}

/// Checks the credentials and issues a new access token. Earlier tokens stay valid.
pub async fn login(
    store: &dyn TicketStore,
    username: &str,
    password: &str,
) -> Result<(User, String), AppError> {
    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    let user = store
        .find_user_by_username(username.trim())
        .await?
        .ok_or_else(invalid)?;
    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(password, hash));
    if !verified {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(invalid());
    }

    let token = issue_token();
    store.add_token(user.id, &token).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((user, token))
}

/// Ensures a staff account bound to `token` exists. Safe to call on every start.
///
/// When the configured token changes, the new one replaces every token the
/// account held before. A non-staff account that already owns the configured
/// username is never promoted; startup fails instead.
pub async fn bootstrap_staff(
    store: &dyn TicketStore,
    username: &str,
    token: &str,
) -> Result<User, AppError> {
    let Some(existing) = store.find_user_by_username(username).await? else {
        validate_username(username)?;
        let user = User::new(username, true);
        store.insert_user(&user, token).await?;
        tracing::info!(user_id = %user.id, username, "Staff account created");
        return Ok(user);
    };

    if !existing.is_staff {
        return Err(AppError::ValidationError(format!(
            "Configured admin username '{}' belongs to a non-staff account",
            username
        )));
    }

    match store.find_user_by_token(token).await? {
        Some(owner) if owner.id == existing.id => {}
        Some(_) => {
            return Err(AppError::ValidationError(
                "Configured admin token is issued to another account".to_string(),
            ));
        }
        None => {
            store.add_token(existing.id, token).await?;
            store.revoke_other_tokens(existing.id, token).await?;
            tracing::info!(user_id = %existing.id, username, "Staff token rotated");
        }
    }
    Ok(existing)
}

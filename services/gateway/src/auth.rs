//! Admin authentication (§6.2): a single shared bearer API key, not the
//! per-account JWT/nonce scheme an exchange's order-placement surface would
//! need. There is no notion of "whose account" on a read-only view or an
//! admin action here, so there is nothing for a nonce or signature to
//! protect against replay of.

use crate::error::AppError;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

pub struct AdminUser;

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;
        let header = header.to_str().map_err(|_| AppError::Unauthorized("invalid header encoding".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a Bearer token".into()))?;

        if token != state.admin_api_key {
            return Err(AppError::Unauthorized("invalid admin API key".into()));
        }
        Ok(AdminUser)
    }
}

//! Middleware định danh
//! Ranh giới gateway ↔ service là ranh giới tin cậy: header định danh
//! chỉ được chấp nhận khi kèm khóa chia sẻ đúng.

use crate::{auth::api_key::ApiKeyGenerator, auth::identity::Identity, error::AppError,
    middleware::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use std::sync::Arc;

pub const HEADER_GATEWAY_KEY: &str = "x-gateway-key";
pub const HEADER_INTERNAL_API_KEY: &str = "x-internal-api-key";
pub const HEADER_SERVICE_NAME: &str = "x-service-name";

/// Middleware định danh từ gateway — bắt buộc với mọi route /api/v1
pub async fn gateway_identity_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Tiền đề cứng: request phải đi qua gateway với khóa chia sẻ đúng
    let provided = req
        .headers()
        .get(HEADER_GATEWAY_KEY)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let expected = state.config.security.gateway_shared_secret.expose_secret();
    if !ApiKeyGenerator::verify(provided, expected) {
        tracing::warn!(path = %req.uri().path(), "Gateway key mismatch");
        return Err(AppError::Unauthorized);
    }

    let identity = Identity::from_headers(req.headers())?;

    tracing::debug!(
        user_id = identity.user_id,
        username = %identity.username,
        "Identity attached from gateway headers"
    );

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Middleware khóa nội bộ cho các endpoint /internal
pub async fn internal_api_key_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = match req
        .headers()
        .get(HEADER_INTERNAL_API_KEY)
        .and_then(|v| v.to_str().ok())
    {
        Some(key) => key,
        None => {
            tracing::warn!(path = %req.uri().path(), "Internal API call rejected: missing key");
            return Err(AppError::Unauthorized);
        }
    };

    let expected = state.config.security.internal_api_key.expose_secret();
    if !ApiKeyGenerator::verify(provided, expected) {
        tracing::warn!(path = %req.uri().path(), "Internal API call rejected: invalid key");
        return Err(AppError::Unauthorized);
    }

    let service = req
        .headers()
        .get(HEADER_SERVICE_NAME)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::debug!(service = %service, path = %req.uri().path(), "Internal API call authorized");

    Ok(next.run(req).await)
}

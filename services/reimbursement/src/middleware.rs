//! Middleware for JWT token validation and authentication

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{debug, warn};

use crate::{error::ErsError, state::AppState};

/// Validate the bearer token and attach the caller's `Identity`
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ErsError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        debug!("Missing bearer token for {}", req.uri().path());
        return Err(ErsError::Unauthorized);
    };

    let claims = state
        .jwt_service
        .validate_token(bearer.token())
        .map_err(|e| {
            warn!("Failed to validate token: {}", e);
            ErsError::Unauthorized
        })?;

    req.extensions_mut().insert(claims.identity());

    Ok(next.run(req).await)
}

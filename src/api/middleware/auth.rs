use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::services::profiles::Principal;
use crate::utils::auth::validate_jwt;

/// The principal attached to the current request, `None` for anonymous.
///
/// Anonymous requests are legal; whether they may use a destination is
/// decided by the upload profiles and permission checks, not here.
#[derive(Clone)]
pub struct CurrentPrincipal(pub Option<Principal>);

pub async fn principal_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let principal = token
        .and_then(|token| validate_jwt(&token, &state.config.jwt_secret).ok())
        .map(|claims| Principal::new(claims.sub));

    req.extensions_mut().insert(CurrentPrincipal(principal));
    next.run(req).await
}

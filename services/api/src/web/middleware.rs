//! services/api/src/web/middleware.rs
//!
//! Session validation for protected routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use medichain_core::{ports::UserStores, Role, UserIdentity};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::AuthError;
use crate::web::state::AppState;
use crate::web::token::TokenService;

/// Name of the cookie that carries the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Returns the value of cookie `name` from the `Cookie` header, if present.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name).then_some(value)
        })
        .filter(|value| !value.is_empty())
}

/// Turns a session token into the identity of the user it belongs to.
pub struct SessionValidator<'a> {
    tokens: &'a TokenService,
    users: &'a UserStores,
}

impl<'a> SessionValidator<'a> {
    pub fn new(tokens: &'a TokenService, users: &'a UserStores) -> Self {
        Self { tokens, users }
    }

    pub async fn validate(&self, token: Option<&str>) -> Result<UserIdentity, AuthError> {
        // 1. A token must be present
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        // 2. Verify signature and expiry
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!("Session token rejected: {}", e);
            AuthError::InvalidToken
        })?;

        // 3. Missing or unknown roles resolve to no user, without touching any store
        let role: Role = claims
            .role_tag()
            .and_then(|tag| tag.parse().ok())
            .ok_or_else(|| {
                debug!("Session token carries unrecognized role {:?}", claims.role);
                AuthError::UserNotFound
            })?;

        let id = Uuid::parse_str(&claims.id).map_err(|_| AuthError::InvalidToken)?;

        // 4. Look the subject up in the store for its role
        let record = self
            .users
            .for_role(role)
            .find_by_id(id)
            .await
            .map_err(|e| {
                error!("Failed to look up {} {}: {:?}", role, id, e);
                AuthError::InvalidToken
            })?
            .ok_or(AuthError::UserNotFound)?;

        // 5. Normalize
        Ok(UserIdentity::from_record(record, role))
    }
}

/// Middleware that validates the `token` cookie and attaches the caller's identity.
///
/// On success the [`UserIdentity`] is inserted into request extensions for
/// handlers to use. Otherwise the request ends here with a 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let validator = SessionValidator::new(&state.tokens, &state.users);
    let outcome = validator
        .validate(read_cookie(req.headers(), TOKEN_COOKIE))
        .await;

    match outcome {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

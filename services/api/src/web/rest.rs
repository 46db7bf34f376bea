//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use crate::error::MessageResponse;
use crate::web::auth::{AuthResponse, IdentityResponse, LoginRequest, SignupRequest};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
    ),
    components(
        schemas(SignupRequest, LoginRequest, AuthResponse, IdentityResponse, MessageResponse)
    ),
    tags(
        (name = "MediChain API", description = "Account and session endpoints for patients, doctors and hospitals.")
    )
)]
pub struct ApiDoc;

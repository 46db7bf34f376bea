//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, logout and the session check.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use medichain_core::{
    ports::PortError, NewUser, Role, RoleProfile, UserIdentity, UserRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{reject, HandlerError, MessageResponse};
use crate::web::middleware::TOKEN_COOKIE;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

// Absent fields deserialize to `None` and are rejected by the handler.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    /// One of `patient`, `doctor` or `hospital`.
    pub role: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// `YYYY-MM-DD`; required for patients and doctors.
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// The normalized identity of a signed-in user.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<UserIdentity> for IdentityResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            id: identity.id,
            uid: identity.uid,
            name: identity.name,
            email: identity.email,
            role: identity.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: IdentityResponse,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a patient, doctor or hospital account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request", body = MessageResponse),
        (status = 409, description = "Email or licence number already registered", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(req) = body.map_err(bad_body)?;

    // 1. Validate the role and the fields it requires
    let role = parse_role(req.role.as_deref())?;
    let name = required(req.name.as_ref(), "name")?;
    let email = required(req.email.as_ref(), "email")?;
    let password = present(req.password.as_ref(), "password")?;
    let profile = build_profile(role, &req)?;

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password")
        })?
        .to_string();

    // 3. Create the account in the role's store
    let new_user = NewUser {
        name,
        email,
        hashed_password: password_hash,
        profile,
    };
    let record = state
        .users
        .for_role(role)
        .insert(new_user)
        .await
        .map_err(|e| match e {
            PortError::Conflict(reason) => reject(StatusCode::CONFLICT, reason),
            e => {
                error!("Failed to create {}: {:?}", role, e);
                reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user")
            }
        })?;
    info!("Created {} account {}", role, record.uid);

    // 4. Start a session
    let cookie = start_session(&state, &record, role)?;
    let response = AuthResponse {
        message: "Signup successful".to_string(),
        user: UserIdentity::from_record(record, role).into(),
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid role", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(req) = body.map_err(bad_body)?;
    let role = parse_role(req.role.as_deref())?;
    let email = required(req.email.as_ref(), "email")?;
    let password = present(req.password.as_ref(), "password")?;
    let store = state.users.for_role(role);
    let invalid = || reject(StatusCode::UNAUTHORIZED, "Invalid email or password");

    // 1. Get credentials by email
    let creds = store
        .find_credentials_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                warn!("Login attempt for unknown {} account", role);
                invalid()
            }
            e => {
                error!("Failed to get {} credentials: {:?}", role, e);
                reject(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
            }
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
    })?;

    let valid = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        warn!("Wrong password for {} {}", role, creds.id);
        return Err(invalid());
    }

    // 3. Load the record for the response
    let record = store
        .find_by_id(creds.id)
        .await
        .map_err(|e| {
            error!("Failed to load {} {}: {:?}", role, creds.id, e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
        })?
        .ok_or_else(invalid)?;

    // 4. Start a session
    let cookie = start_session(&state, &record, role)?;
    let response = AuthResponse {
        message: "Login successful".to_string(),
        user: UserIdentity::from_record(record, role).into(),
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// GET /auth/logout - Clear the session cookie
#[utoipa::path(
    get,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse)
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = cookie_header("", 0, state.config.cookie_secure);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("Sayonara... さよなら...")),
    )
}

/// GET /auth/me - Return the identity attached by the session validator
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Active session", body = IdentityResponse),
        (status = 401, description = "Missing, invalid or orphaned session", body = MessageResponse)
    )
)]
pub async fn session_handler(Extension(identity): Extension<UserIdentity>) -> Json<IdentityResponse> {
    Json(identity.into())
}

//=========================================================================================
// Helpers
//=========================================================================================

fn bad_body(rejection: JsonRejection) -> HandlerError {
    reject(
        StatusCode::BAD_REQUEST,
        format!("Invalid request body: {}", rejection.body_text()),
    )
}

fn parse_role(tag: Option<&str>) -> Result<Role, HandlerError> {
    tag.and_then(|t| t.parse::<Role>().ok())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Invalid role"))
}

/// Like [`required`] but keeps the value untrimmed (passwords).
fn present<'a>(value: Option<&'a String>, field: &str) -> Result<&'a str, HandlerError> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            reject(
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {}", field),
            )
        })
}

fn required(value: Option<&String>, field: &str) -> Result<String, HandlerError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            reject(
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {}", field),
            )
        })
}

fn parse_dob(value: Option<&String>) -> Result<NaiveDate, HandlerError> {
    let raw = required(value, "dob")?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Invalid date of birth"))
}

fn build_profile(role: Role, req: &SignupRequest) -> Result<RoleProfile, HandlerError> {
    Ok(match role {
        Role::Patient => RoleProfile::Patient {
            dob: parse_dob(req.dob.as_ref())?,
            gender: required(req.gender.as_ref(), "gender")?,
        },
        Role::Doctor => RoleProfile::Doctor {
            dob: parse_dob(req.dob.as_ref())?,
            gender: required(req.gender.as_ref(), "gender")?,
            specialization: required(req.specialization.as_ref(), "specialization")?,
            license_number: required(req.license_number.as_ref(), "licenseNumber")?,
        },
        Role::Hospital => RoleProfile::Hospital,
    })
}

/// Issues a token for `record` and returns the `Set-Cookie` value carrying it.
fn start_session(state: &AppState, record: &UserRecord, role: Role) -> Result<String, HandlerError> {
    let token = state.tokens.issue(record.id, role).map_err(|e| {
        error!("Failed to issue session token: {:?}", e);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
    })?;
    Ok(cookie_header(
        &token,
        state.tokens.ttl().num_seconds(),
        state.config.cookie_secure,
    ))
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

//! crates/medichain_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{NewUser, Role, UserCredentials, UserRecord};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// One backing collection of user accounts (patients, doctors or hospitals).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a record by its identifier. `Ok(None)` means no such record.
    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<UserRecord>>;

    async fn find_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Persists a new account. Fails with `Conflict` if the email is taken.
    async fn insert(&self, new_user: NewUser) -> PortResult<UserRecord>;
}

/// The three role-specific stores, addressed by [`Role`].
#[derive(Clone)]
pub struct UserStores {
    pub patients: Arc<dyn UserStore>,
    pub doctors: Arc<dyn UserStore>,
    pub hospitals: Arc<dyn UserStore>,
}

impl UserStores {
    pub fn for_role(&self, role: Role) -> &dyn UserStore {
        match role {
            Role::Patient => self.patients.as_ref(),
            Role::Doctor => self.doctors.as_ref(),
            Role::Hospital => self.hospitals.as_ref(),
        }
    }
}

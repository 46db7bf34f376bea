//! crates/medichain_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Role
//=========================================================================================

/// The three fixed account kinds. Each one is backed by its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Patient,
    Doctor,
    Hospital,
}

/// Returned when a role tag is not one of `patient`, `doctor` or `hospital`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Hospital];

    /// The wire tag carried in session tokens and request bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Hospital => "hospital",
        }
    }

    /// Prefix used when generating a human-facing `uid`.
    pub fn uid_prefix(&self) -> &'static str {
        match self {
            Role::Patient => "PAT",
            Role::Doctor => "DOC",
            Role::Hospital => "HOS",
        }
    }

    /// Generates a fresh `uid` such as `PAT-3F9A12C0`.
    pub fn new_uid(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
        format!("{}-{}", self.uid_prefix(), suffix)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    // Exact, case-sensitive match only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "hospital" => Ok(Role::Hospital),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// A persisted patient, doctor or hospital account as read from its store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The normalized identity attached to a request after session validation.
///
/// Built fresh for every request and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl UserIdentity {
    /// `role` is the role decoded from the session token, not the record's.
    pub fn from_record(record: UserRecord, role: Role) -> Self {
        Self {
            id: record.id,
            uid: record.uid,
            name: record.name,
            email: record.email,
            role,
        }
    }
}

/// Role-specific fields collected at signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleProfile {
    Patient {
        dob: NaiveDate,
        gender: String,
    },
    Doctor {
        dob: NaiveDate,
        gender: String,
        specialization: String,
        license_number: String,
    },
    Hospital,
}

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Patient { .. } => Role::Patient,
            RoleProfile::Doctor { .. } => Role::Doctor,
            RoleProfile::Hospital => Role::Hospital,
        }
    }
}

// Only used internally for signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub profile: RoleProfile,
}

impl NewUser {
    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub role: Role,
    pub hashed_password: String,
}

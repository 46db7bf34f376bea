//! services/api/src/web/test_helpers.rs
//!
//! In-memory user stores and state builders shared by the handler tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use medichain_core::{
    ports::{PortError, PortResult, UserStore, UserStores},
    NewUser, Role, RoleProfile, UserCredentials, UserRecord,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::web::state::AppState;
use crate::web::token::SessionClaims;

pub const TEST_SECRET: &str = "test_secret_key";

struct StoredUser {
    record: UserRecord,
    hashed_password: String,
    license_number: Option<String>,
}

/// A `UserStore` kept in memory that counts `find_by_id` calls.
pub struct MemoryUserStore {
    role: Role,
    users: Mutex<Vec<StoredUser>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryUserStore {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            users: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Makes every following `find_by_id` return an error.
    pub fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<UserRecord> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.record.clone())
            .collect()
    }

    fn push(&self, record: UserRecord, hashed_password: String, license_number: Option<String>) {
        self.users.lock().unwrap().push(StoredUser {
            record,
            hashed_password,
            license_number,
        });
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<UserRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.record.id == id)
            .map(|u| u.record.clone()))
    }

    async fn find_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.record.email == email)
            .map(|u| UserCredentials {
                id: u.record.id,
                role: self.role,
                hashed_password: u.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("{} {} not found", self.role, email)))
    }

    async fn insert(&self, new_user: NewUser) -> PortResult<UserRecord> {
        if new_user.role() != self.role {
            return Err(PortError::Unexpected(format!(
                "{} profile sent to the {} store",
                new_user.role(),
                self.role
            )));
        }
        let license_number = match &new_user.profile {
            RoleProfile::Doctor { license_number, .. } => Some(license_number.clone()),
            _ => None,
        };
        {
            let users = self.users.lock().unwrap();
            if users.iter().any(|u| u.record.email == new_user.email) {
                return Err(PortError::Conflict("User already exists".to_string()));
            }
            if license_number.is_some()
                && users.iter().any(|u| u.license_number == license_number)
            {
                return Err(PortError::Conflict(
                    "License number already registered".to_string(),
                ));
            }
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            uid: self.role.new_uid(),
            name: new_user.name,
            email: new_user.email,
            role: self.role,
        };
        self.push(record.clone(), new_user.hashed_password, license_number);
        Ok(record)
    }
}

/// The three in-memory stores plus the `UserStores` view over them.
pub struct TestStores {
    pub patients: Arc<MemoryUserStore>,
    pub doctors: Arc<MemoryUserStore>,
    pub hospitals: Arc<MemoryUserStore>,
}

impl TestStores {
    pub fn new() -> Self {
        Self {
            patients: Arc::new(MemoryUserStore::new(Role::Patient)),
            doctors: Arc::new(MemoryUserStore::new(Role::Doctor)),
            hospitals: Arc::new(MemoryUserStore::new(Role::Hospital)),
        }
    }

    pub fn user_stores(&self) -> UserStores {
        UserStores {
            patients: self.patients.clone(),
            doctors: self.doctors.clone(),
            hospitals: self.hospitals.clone(),
        }
    }

    pub fn store(&self, role: Role) -> &MemoryUserStore {
        match role {
            Role::Patient => self.patients.as_ref(),
            Role::Doctor => self.doctors.as_ref(),
            Role::Hospital => self.hospitals.as_ref(),
        }
    }

    pub fn total_lookups(&self) -> usize {
        Role::ALL.iter().map(|r| self.store(*r).lookups()).sum()
    }

    /// Adds a record directly, bypassing signup.
    pub fn seed(&self, role: Role, name: &str, email: &str) -> UserRecord {
        let record = UserRecord {
            id: Uuid::new_v4(),
            uid: role.new_uid(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        };
        self.store(role).push(record.clone(), String::new(), None);
        record
    }
}

pub fn patient(stores: &TestStores) -> UserRecord {
    stores.seed(Role::Patient, "Asha Verma", "asha@example.com")
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/medichain_test".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "COOKIE_SECURE" => Some("false".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn test_state(stores: &TestStores) -> Arc<AppState> {
    Arc::new(AppState::new(stores.user_stores(), Arc::new(test_config())))
}

/// Signs a token with the given role tag, valid for one hour.
pub fn sign_claims(state: &AppState, id: &str, role: &str) -> String {
    sign_raw_role(state, id, Some(Value::from(role)))
}

/// Signs a token whose `role` claim is arbitrary JSON, or absent for `None`.
pub fn sign_raw_role(state: &AppState, id: &str, role: Option<Value>) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        id: id.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    state.tokens.sign(&claims).unwrap()
}

//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `UserStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use medichain_core::domain::{NewUser, Role, RoleProfile, UserCredentials, UserRecord};
use medichain_core::ports::{PortError, PortResult, UserStore, UserStores};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A `UserStore` backed by the table of a single role.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
    role: Role,
}

impl PgUserStore {
    /// Creates a new `PgUserStore` for `role`.
    pub fn new(pool: PgPool, role: Role) -> Self {
        Self { pool, role }
    }

    /// Builds the three role stores over one connection pool.
    pub fn stores(pool: PgPool) -> UserStores {
        UserStores {
            patients: Arc::new(Self::new(pool.clone(), Role::Patient)),
            doctors: Arc::new(Self::new(pool.clone(), Role::Doctor)),
            hospitals: Arc::new(Self::new(pool, Role::Hospital)),
        }
    }

    fn table(&self) -> &'static str {
        match self.role {
            Role::Patient => "patients",
            Role::Doctor => "doctors",
            Role::Hospital => "hospitals",
        }
    }
}

/// Applies the schema migrations at startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    uid: String,
    name: String,
    email: String,
}
impl UserRow {
    fn to_domain(self, role: Role) -> UserRecord {
        UserRecord {
            id: self.id,
            uid: self.uid,
            name: self.name,
            email: self.email,
            role,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    id: Uuid,
    hashed_password: String,
}

/// Unique constraint guarding `doctors.license_number` (see migrations).
const DOCTOR_LICENSE_CONSTRAINT: &str = "doctors_license_number_key";

/// The client-facing reason for a unique violation on `constraint`.
fn conflict_reason(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(DOCTOR_LICENSE_CONSTRAINT) => "License number already registered",
        _ => "User already exists",
    }
}

fn map_write_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(conflict_reason(db.constraint()).to_string())
        }
        e => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT id, uid, name, email FROM {} WHERE id = $1",
            self.table()
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(row.map(|r| r.to_domain(self.role)))
    }

    async fn find_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!(
            "SELECT id, hashed_password FROM {} WHERE email = $1",
            self.table()
        );
        let row = sqlx::query_as::<_, CredentialsRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .ok_or_else(|| PortError::NotFound(format!("{} {} not found", self.role, email)))?;

        Ok(UserCredentials {
            id: row.id,
            role: self.role,
            hashed_password: row.hashed_password,
        })
    }

    async fn insert(&self, new_user: NewUser) -> PortResult<UserRecord> {
        if new_user.role() != self.role {
            return Err(PortError::Unexpected(format!(
                "{} profile sent to the {} store",
                new_user.role(),
                self.role
            )));
        }

        let id = Uuid::new_v4();
        let uid = self.role.new_uid();

        let row = match &new_user.profile {
            RoleProfile::Patient { dob, gender } => {
                sqlx::query_as::<_, UserRow>(
                    "INSERT INTO patients (id, uid, name, email, hashed_password, dob, gender) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id, uid, name, email",
                )
                .bind(id)
                .bind(&uid)
                .bind(&new_user.name)
                .bind(&new_user.email)
                .bind(&new_user.hashed_password)
                .bind(dob)
                .bind(gender)
                .fetch_one(&self.pool)
                .await
            }
            RoleProfile::Doctor {
                dob,
                gender,
                specialization,
                license_number,
            } => {
                sqlx::query_as::<_, UserRow>(
                    "INSERT INTO doctors (id, uid, name, email, hashed_password, dob, gender, specialization, license_number) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id, uid, name, email",
                )
                .bind(id)
                .bind(&uid)
                .bind(&new_user.name)
                .bind(&new_user.email)
                .bind(&new_user.hashed_password)
                .bind(dob)
                .bind(gender)
                .bind(specialization)
                .bind(license_number)
                .fetch_one(&self.pool)
                .await
            }
            RoleProfile::Hospital => {
                sqlx::query_as::<_, UserRow>(
                    "INSERT INTO hospitals (id, uid, name, email, hashed_password) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING id, uid, name, email",
                )
                .bind(id)
                .bind(&uid)
                .bind(&new_user.name)
                .bind(&new_user.email)
                .bind(&new_user.hashed_password)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(map_write_error)?;

        Ok(row.to_domain(self.role))
    }
}

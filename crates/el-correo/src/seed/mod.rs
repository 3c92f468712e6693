//! Idempotent population and repair routines.
//!
//! Every routine uses get-or-create semantics, so running it twice leaves the store as running
//! it once did. Dependent rows are only ever topped up to a target count.

mod accounts;
mod org;

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::ServiceError;
use crate::identity::PasswordHasher;
use crate::store::Store;

/// Outcome of one routine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub routine: &'static str,
    pub created: usize,
    pub existing: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SeedReport {
    fn new(routine: &'static str) -> Self {
        Self {
            routine,
            ..Self::default()
        }
    }

    fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.existing += 1;
        }
    }

    fn logged(self) -> Self {
        info!(
            routine = self.routine,
            created = self.created,
            existing = self.existing,
            updated = self.updated,
            deleted = self.deleted,
            "seed routine finished"
        );
        self
    }
}

/// Sample accounts created by `seed_users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSeedOptions {
    pub groups: Vec<String>,
    pub create_base: bool,
    pub extra: usize,
    pub prefix: String,
    pub password: String,
    pub update_password: bool,
    pub staff_groups: Vec<String>,
    pub superuser: String,
}

impl Default for UserSeedOptions {
    fn default() -> Self {
        Self {
            groups: ["admin", "manager", "developer", "viewer", "support", "sales", "hr"]
                .map(String::from)
                .to_vec(),
            create_base: true,
            extra: 10,
            prefix: "user".to_string(),
            password: "pass1234".to_string(),
            update_password: false,
            staff_groups: vec!["admin".to_string(), "manager".to_string()],
            superuser: "admin_user".to_string(),
        }
    }
}

/// Knobs for the combined routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    pub users: UserSeedOptions,
    pub per_worker: usize,
    pub wipe_cargas: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: UserSeedOptions::default(),
            per_worker: 2,
            wipe_cargas: false,
        }
    }
}

pub struct Seeder<S: ?Sized> {
    store: Arc<S>,
    hasher: Arc<PasswordHasher>,
}

impl<S> Seeder<S>
where
    S: Store + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, hasher: Arc<PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Roles, sample users, and the demo organization, then repair of incomplete records.
    pub async fn bootstrap(&self, options: &SeedOptions) -> Result<Vec<SeedReport>, ServiceError> {
        Ok(vec![
            self.init_roles().await?,
            self.seed_users(&options.users).await?,
            self.seed_demo_org().await?,
            self.repair().await?,
        ])
    }

    /// Users, the HR accounts, the demo organization, and family dependents.
    pub async fn seed_all(&self, options: &SeedOptions) -> Result<Vec<SeedReport>, ServiceError> {
        Ok(vec![
            self.seed_users(&options.users).await?,
            self.seed_rrhh().await?,
            self.seed_demo_org().await?,
            self.seed_cargas(options.per_worker, options.wipe_cargas)
                .await?,
        ])
    }
}

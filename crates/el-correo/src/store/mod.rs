//! Persistence seam for the catalog, worker registry, accounts, and sessions.
//!
//! Two implementations: [`MemoryStore`] for tests and demos, [`SeaOrmStore`] over MySQL or
//! SQLite for deployments. Every write method is one atomic unit: it either applies completely
//! or leaves the store untouched. Uniqueness and referential rules (cascade vs. nullify) are
//! the store's job, so services never have to re-check them under concurrency.

mod memory;
pub mod sql;

pub use memory::MemoryStore;
pub use sql::SeaOrmStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::{
    Area, AreaId, AreaRow, Cargo, CargoId, CargoRow, CatalogCounts, Departamento, DepartamentoId,
    DepartamentoRow,
};
use crate::identity::{Identity, IdentityId, NewIdentity, Session};
use crate::workers::{
    CargaFamiliar, CargaFields, ContactoEmergencia, ContactoFields, NewTrabajador, ProfileUpdate,
    Trabajador, WorkerId, WorkerRow,
};

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key on {entity}.{field}")]
    DuplicateKey {
        entity: &'static str,
        field: &'static str,
    },
    #[error("{entity}.{field} references a missing row")]
    ForeignKey {
        entity: &'static str,
        field: &'static str,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Areas, departments, and job titles.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_area(&self, nombre: &str) -> Result<Area, StoreError>;
    /// Returns the row and whether this call created it.
    async fn get_or_create_area(&self, nombre: &str) -> Result<(Area, bool), StoreError>;
    async fn fetch_area(&self, id: AreaId) -> Result<Option<Area>, StoreError>;
    async fn rename_area(&self, id: AreaId, nombre: &str) -> Result<Area, StoreError>;
    /// Cascades to the area's departments; nullifies worker references.
    async fn delete_area(&self, id: AreaId) -> Result<(), StoreError>;
    async fn area_rows(&self) -> Result<Vec<AreaRow>, StoreError>;

    async fn insert_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError>;
    async fn get_or_create_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<(Departamento, bool), StoreError>;
    async fn fetch_departamento(
        &self,
        id: DepartamentoId,
    ) -> Result<Option<Departamento>, StoreError>;
    async fn update_departamento(
        &self,
        id: DepartamentoId,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError>;
    /// Nullifies worker references, never deletes workers.
    async fn delete_departamento(&self, id: DepartamentoId) -> Result<(), StoreError>;
    async fn departamento_rows(&self) -> Result<Vec<DepartamentoRow>, StoreError>;

    async fn insert_cargo(&self, nombre: &str) -> Result<Cargo, StoreError>;
    async fn get_or_create_cargo(&self, nombre: &str) -> Result<(Cargo, bool), StoreError>;
    async fn fetch_cargo(&self, id: CargoId) -> Result<Option<Cargo>, StoreError>;
    async fn rename_cargo(&self, id: CargoId, nombre: &str) -> Result<Cargo, StoreError>;
    /// Nullifies worker references, never deletes workers.
    async fn delete_cargo(&self, id: CargoId) -> Result<(), StoreError>;
    async fn cargo_rows(&self) -> Result<Vec<CargoRow>, StoreError>;

    async fn catalog_counts(&self) -> Result<CatalogCounts, StoreError>;
}

/// Worker records and the dependent collections they own.
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// Inserts the worker and its dependents together. Fails with `DuplicateKey` when the
    /// identity already owns a worker.
    async fn insert_worker(
        &self,
        identity_id: IdentityId,
        worker: NewTrabajador,
        contactos: Vec<ContactoFields>,
        cargas: Vec<CargaFields>,
    ) -> Result<Trabajador, StoreError>;
    async fn fetch_worker(&self, id: WorkerId) -> Result<Option<Trabajador>, StoreError>;
    async fn worker_for_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<Trabajador>, StoreError>;
    async fn workers(&self) -> Result<Vec<Trabajador>, StoreError>;
    /// Workers annotated with placement and account names, read as one snapshot.
    async fn worker_rows(&self) -> Result<Vec<WorkerRow>, StoreError>;
    /// Whole-row replacement used by administrative repair.
    async fn replace_worker(&self, worker: Trabajador) -> Result<(), StoreError>;
    /// Personal fields plus both dependent batches, all or nothing.
    async fn apply_profile_update(
        &self,
        id: WorkerId,
        update: ProfileUpdate,
    ) -> Result<Trabajador, StoreError>;
    /// Cascades to the worker's contacts and dependents.
    async fn delete_worker(&self, id: WorkerId) -> Result<(), StoreError>;
    async fn contactos(&self, id: WorkerId) -> Result<Vec<ContactoEmergencia>, StoreError>;
    async fn cargas(&self, id: WorkerId) -> Result<Vec<CargaFamiliar>, StoreError>;
    async fn insert_carga(
        &self,
        id: WorkerId,
        carga: CargaFields,
    ) -> Result<CargaFamiliar, StoreError>;
    /// Removes every dependent row; returns how many were deleted.
    async fn delete_all_cargas(&self) -> Result<usize, StoreError>;
    async fn count_workers(&self) -> Result<usize, StoreError>;
}

/// Accounts and named groups.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError>;
    /// Inserts the account and, when given, its worker record in one unit.
    async fn register_identity(
        &self,
        identity: NewIdentity,
        worker: Option<NewTrabajador>,
    ) -> Result<(Identity, Option<Trabajador>), StoreError>;
    async fn fetch_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;
    async fn identity_by_username(&self, username: &str)
        -> Result<Option<Identity>, StoreError>;
    /// Case-insensitive e-mail lookup.
    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;
    async fn identities(&self) -> Result<Vec<Identity>, StoreError>;
    async fn replace_identity(&self, identity: Identity) -> Result<(), StoreError>;
    /// Cascades to the owned worker and its dependents.
    async fn delete_identity(&self, id: IdentityId) -> Result<(), StoreError>;
    /// Get-or-create a named group; returns whether it was created.
    async fn ensure_group(&self, name: &str) -> Result<bool, StoreError>;
    async fn group_exists(&self, name: &str) -> Result<bool, StoreError>;
    async fn groups(&self) -> Result<Vec<String>, StoreError>;
    async fn count_identities(&self) -> Result<usize, StoreError>;
}

/// Login sessions. Expiry is stored with each row; callers decide what "now" is.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fails with `ForeignKey` when the identity does not exist.
    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;
    async fn fetch_session(&self, token: &str) -> Result<Option<Session>, StoreError>;
    /// Returns whether the token existed.
    async fn delete_session(&self, token: &str) -> Result<bool, StoreError>;
    async fn delete_sessions_for(&self, identity_id: IdentityId) -> Result<usize, StoreError>;
    /// Removes every session expired at `now`; returns how many were deleted.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Everything the services need from persistence.
pub trait Store:
    CatalogRepository + WorkerRepository + IdentityRepository + SessionRepository
{
}

impl<T> Store for T where
    T: CatalogRepository + WorkerRepository + IdentityRepository + SessionRepository
{
}

//! Relational store over sea-orm (MySQL in deployments, SQLite for local runs and tests).
//!
//! The schema comes from the `migration` crate and is brought up to date on connect. Every
//! multi-row write runs inside one transaction. Cascades and nullifications are applied
//! explicitly in that transaction and are also declared on the foreign keys.

pub mod entity;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{info, warn};

use self::entity::{
    area, carga, cargo, contacto, departamento, group, identity, identity_group, session,
    trabajador,
};
use super::{
    CatalogRepository, IdentityRepository, SessionRepository, StoreError, WorkerRepository,
};
use crate::catalog::{
    Area, AreaId, AreaRow, Cargo, CargoId, CargoRow, CatalogCounts, Departamento, DepartamentoId,
    DepartamentoRow,
};
use crate::identity::{Identity, IdentityId, NewIdentity, Session};
use crate::workers::{
    CargaFamiliar, CargaFields, CargaId, ContactoEmergencia, ContactoFields, ContactoId,
    NewTrabajador, ProfileUpdate, RowWrite, Sexo, Trabajador, WorkerId, WorkerRow,
};

/// Store backed by a sea-orm connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

fn unavailable(err: DbErr) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Map a failed write, turning constraint violations the pre-checks raced with into the same
/// errors the pre-checks would have produced.
fn write_error(err: DbErr, entity: &'static str, field: &'static str) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateKey { entity, field },
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => StoreError::ForeignKey { entity, field },
        _ => unavailable(err),
    }
}

fn count(rows: u64) -> usize {
    usize::try_from(rows).unwrap_or(usize::MAX)
}

fn to_epoch(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

/// Unreadable timestamps read as the distant past, which makes the session expired.
fn from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl SeaOrmStore {
    /// Connect and run pending migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(url.to_string());
        options
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        if url.starts_with("sqlite::memory:") {
            // One connection keeps every query on the same in-memory database.
            options.max_connections(1).min_connections(1);
        }

        let db = Database::connect(options).await.map_err(unavailable)?;
        Migrator::up(&db, None).await.map_err(unavailable)?;
        info!(backend = ?db.get_database_backend(), "database ready");
        Ok(Self { db })
    }

    /// Fresh private SQLite database, used by tests and demos.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn area_of(model: area::Model) -> Area {
    Area {
        id: AreaId(model.id),
        nombre: model.nombre,
    }
}

fn departamento_of(model: departamento::Model) -> Departamento {
    Departamento {
        id: DepartamentoId(model.id),
        nombre: model.nombre,
        area_id: AreaId(model.area_id),
    }
}

fn cargo_of(model: cargo::Model) -> Cargo {
    Cargo {
        id: CargoId(model.id),
        nombre: model.nombre,
    }
}

fn worker_of(model: trabajador::Model) -> Trabajador {
    let sexo = Sexo::from_code(&model.sexo).unwrap_or_else(|| {
        warn!(worker_id = model.id, code = %model.sexo, "unknown sexo code read as Otro");
        Sexo::Otro
    });
    Trabajador {
        id: WorkerId(model.id),
        identity_id: IdentityId(model.identity_id),
        nombres: model.nombres,
        apellidos: model.apellidos,
        rut: model.rut,
        sexo,
        fecha_ingreso: model.fecha_ingreso,
        area_id: model.area_id.map(AreaId),
        departamento_id: model.departamento_id.map(DepartamentoId),
        cargo_id: model.cargo_id.map(CargoId),
        telefono: model.telefono,
        direccion: model.direccion,
    }
}

fn contacto_of(model: contacto::Model) -> ContactoEmergencia {
    ContactoEmergencia {
        id: ContactoId(model.id),
        trabajador_id: WorkerId(model.trabajador_id),
        nombre: model.nombre,
        parentesco: model.parentesco,
        telefono: model.telefono,
    }
}

fn carga_of(model: carga::Model) -> CargaFamiliar {
    CargaFamiliar {
        id: CargaId(model.id),
        trabajador_id: WorkerId(model.trabajador_id),
        nombre: model.nombre,
        parentesco: model.parentesco,
        fecha_nacimiento: model.fecha_nacimiento,
    }
}

fn identity_of(model: identity::Model, groups: BTreeSet<String>) -> Identity {
    Identity {
        id: IdentityId(model.id),
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        is_superuser: model.is_superuser,
        is_staff: model.is_staff,
        groups,
        date_joined: model.date_joined,
    }
}

fn session_of(model: session::Model) -> Session {
    Session {
        token: model.token,
        identity_id: IdentityId(model.identity_id),
        created_at: from_epoch(model.created_at),
        expires_at: from_epoch(model.expires_at),
    }
}

async fn group_names<C: ConnectionTrait>(
    conn: &C,
    identity_id: i64,
) -> Result<BTreeSet<String>, StoreError> {
    let group_ids: Vec<i64> = identity_group::Entity::find()
        .filter(identity_group::Column::IdentityId.eq(identity_id))
        .all(conn)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(|membership| membership.group_id)
        .collect();
    if group_ids.is_empty() {
        return Ok(BTreeSet::new());
    }
    Ok(group::Entity::find()
        .filter(group::Column::Id.is_in(group_ids))
        .all(conn)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(|group| group.name)
        .collect())
}

async fn load_identity<C: ConnectionTrait>(
    conn: &C,
    model: identity::Model,
) -> Result<Identity, StoreError> {
    let groups = group_names(conn, model.id).await?;
    Ok(identity_of(model, groups))
}

/// Group ids for the given names; every name must exist.
async fn group_ids<C: ConnectionTrait>(
    conn: &C,
    names: &BTreeSet<String>,
) -> Result<Vec<i64>, StoreError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let found = group::Entity::find()
        .filter(group::Column::Name.is_in(names.iter().cloned()))
        .all(conn)
        .await
        .map_err(unavailable)?;
    if found.len() != names.len() {
        return Err(StoreError::ForeignKey {
            entity: "identity",
            field: "groups",
        });
    }
    Ok(found.into_iter().map(|group| group.id).collect())
}

async fn set_memberships<C: ConnectionTrait>(
    conn: &C,
    identity_id: i64,
    group_ids: Vec<i64>,
) -> Result<(), StoreError> {
    identity_group::Entity::delete_many()
        .filter(identity_group::Column::IdentityId.eq(identity_id))
        .exec(conn)
        .await
        .map_err(unavailable)?;
    if group_ids.is_empty() {
        return Ok(());
    }
    let rows = group_ids
        .into_iter()
        .map(|group_id| identity_group::ActiveModel {
            identity_id: Set(identity_id),
            group_id: Set(group_id),
        });
    identity_group::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(|err| write_error(err, "identity", "groups"))?;
    Ok(())
}

async fn push_identity<C: ConnectionTrait>(
    conn: &C,
    new: NewIdentity,
) -> Result<Identity, StoreError> {
    let taken = identity::Entity::find()
        .filter(identity::Column::Username.eq(new.username.as_str()))
        .one(conn)
        .await
        .map_err(unavailable)?;
    if taken.is_some() {
        return Err(StoreError::DuplicateKey {
            entity: "identity",
            field: "username",
        });
    }
    let ids = group_ids(conn, &new.groups).await?;

    let model = identity::ActiveModel {
        username: Set(new.username),
        email: Set(new.email),
        password_hash: Set(new.password_hash),
        is_superuser: Set(new.is_superuser),
        is_staff: Set(new.is_staff),
        date_joined: Set(new.date_joined),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| write_error(err, "identity", "username"))?;
    set_memberships(conn, model.id, ids).await?;
    Ok(identity_of(model, new.groups))
}

async fn check_worker_refs<C: ConnectionTrait>(
    conn: &C,
    area_id: Option<AreaId>,
    departamento_id: Option<DepartamentoId>,
    cargo_id: Option<CargoId>,
) -> Result<(), StoreError> {
    let missing = |field| StoreError::ForeignKey {
        entity: "trabajador",
        field,
    };
    if let Some(id) = area_id {
        if area::Entity::find_by_id(id.0)
            .one(conn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(missing("area"));
        }
    }
    if let Some(id) = departamento_id {
        if departamento::Entity::find_by_id(id.0)
            .one(conn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(missing("departamento"));
        }
    }
    if let Some(id) = cargo_id {
        if cargo::Entity::find_by_id(id.0)
            .one(conn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(missing("cargo"));
        }
    }
    Ok(())
}

async fn push_worker<C: ConnectionTrait>(
    conn: &C,
    identity_id: IdentityId,
    new: NewTrabajador,
) -> Result<Trabajador, StoreError> {
    if identity::Entity::find_by_id(identity_id.0)
        .one(conn)
        .await
        .map_err(unavailable)?
        .is_none()
    {
        return Err(StoreError::ForeignKey {
            entity: "trabajador",
            field: "identity",
        });
    }
    let owned = trabajador::Entity::find()
        .filter(trabajador::Column::IdentityId.eq(identity_id.0))
        .one(conn)
        .await
        .map_err(unavailable)?;
    if owned.is_some() {
        return Err(StoreError::DuplicateKey {
            entity: "trabajador",
            field: "identity",
        });
    }
    check_worker_refs(conn, new.area_id, new.departamento_id, new.cargo_id).await?;

    let model = trabajador::ActiveModel {
        identity_id: Set(identity_id.0),
        nombres: Set(new.nombres),
        apellidos: Set(new.apellidos),
        rut: Set(new.rut),
        sexo: Set(new.sexo.code().to_string()),
        fecha_ingreso: Set(new.fecha_ingreso),
        area_id: Set(new.area_id.map(|id| id.0)),
        departamento_id: Set(new.departamento_id.map(|id| id.0)),
        cargo_id: Set(new.cargo_id.map(|id| id.0)),
        telefono: Set(new.telefono),
        direccion: Set(new.direccion),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| write_error(err, "trabajador", "identity"))?;
    Ok(worker_of(model))
}

async fn push_contacto<C: ConnectionTrait>(
    conn: &C,
    trabajador_id: WorkerId,
    fields: ContactoFields,
) -> Result<(), StoreError> {
    contacto::ActiveModel {
        trabajador_id: Set(trabajador_id.0),
        nombre: Set(fields.nombre),
        parentesco: Set(fields.parentesco),
        telefono: Set(fields.telefono),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| write_error(err, "contacto_emergencia", "trabajador"))?;
    Ok(())
}

async fn push_carga<C: ConnectionTrait>(
    conn: &C,
    trabajador_id: WorkerId,
    fields: CargaFields,
) -> Result<CargaFamiliar, StoreError> {
    let model = carga::ActiveModel {
        trabajador_id: Set(trabajador_id.0),
        nombre: Set(fields.nombre),
        parentesco: Set(fields.parentesco),
        fecha_nacimiento: Set(fields.fecha_nacimiento),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| write_error(err, "carga_familiar", "trabajador"))?;
    Ok(carga_of(model))
}

async fn owned_contacto<C: ConnectionTrait>(
    conn: &C,
    trabajador_id: WorkerId,
    id: ContactoId,
) -> Result<contacto::Model, StoreError> {
    contacto::Entity::find_by_id(id.0)
        .filter(contacto::Column::TrabajadorId.eq(trabajador_id.0))
        .one(conn)
        .await
        .map_err(unavailable)?
        .ok_or(StoreError::NotFound {
            entity: "contacto_emergencia",
            id: id.0,
        })
}

async fn owned_carga<C: ConnectionTrait>(
    conn: &C,
    trabajador_id: WorkerId,
    id: CargaId,
) -> Result<carga::Model, StoreError> {
    carga::Entity::find_by_id(id.0)
        .filter(carga::Column::TrabajadorId.eq(trabajador_id.0))
        .one(conn)
        .await
        .map_err(unavailable)?
        .ok_or(StoreError::NotFound {
            entity: "carga_familiar",
            id: id.0,
        })
}

/// Deletes the given workers together with their contacts and dependents.
async fn remove_workers<C: ConnectionTrait>(conn: &C, ids: Vec<i64>) -> Result<(), StoreError> {
    if ids.is_empty() {
        return Ok(());
    }
    contacto::Entity::delete_many()
        .filter(contacto::Column::TrabajadorId.is_in(ids.clone()))
        .exec(conn)
        .await
        .map_err(unavailable)?;
    carga::Entity::delete_many()
        .filter(carga::Column::TrabajadorId.is_in(ids.clone()))
        .exec(conn)
        .await
        .map_err(unavailable)?;
    trabajador::Entity::delete_many()
        .filter(trabajador::Column::Id.is_in(ids))
        .exec(conn)
        .await
        .map_err(unavailable)?;
    Ok(())
}

#[async_trait]
impl CatalogRepository for SeaOrmStore {
    async fn insert_area(&self, nombre: &str) -> Result<Area, StoreError> {
        let taken = area::Entity::find()
            .filter(area::Column::Nombre.eq(nombre))
            .one(&self.db)
            .await
            .map_err(unavailable)?;
        if taken.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "area",
                field: "nombre",
            });
        }
        let model = area::ActiveModel {
            nombre: Set(nombre.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| write_error(err, "area", "nombre"))?;
        Ok(area_of(model))
    }

    async fn get_or_create_area(&self, nombre: &str) -> Result<(Area, bool), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let existing = area::Entity::find()
            .filter(area::Column::Nombre.eq(nombre))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        let outcome = match existing {
            Some(model) => (area_of(model), false),
            None => {
                let model = area::ActiveModel {
                    nombre: Set(nombre.to_string()),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|err| write_error(err, "area", "nombre"))?;
                (area_of(model), true)
            }
        };
        txn.commit().await.map_err(unavailable)?;
        Ok(outcome)
    }

    async fn fetch_area(&self, id: AreaId) -> Result<Option<Area>, StoreError> {
        Ok(area::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(area_of))
    }

    async fn rename_area(&self, id: AreaId, nombre: &str) -> Result<Area, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let clash = area::Entity::find()
            .filter(area::Column::Nombre.eq(nombre))
            .filter(area::Column::Id.ne(id.0))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        if clash.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "area",
                field: "nombre",
            });
        }
        let model = area::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound {
                entity: "area",
                id: id.0,
            })?;
        let mut active: area::ActiveModel = model.into();
        active.nombre = Set(nombre.to_string());
        let model = active
            .update(&txn)
            .await
            .map_err(|err| write_error(err, "area", "nombre"))?;
        txn.commit().await.map_err(unavailable)?;
        Ok(area_of(model))
    }

    async fn delete_area(&self, id: AreaId) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if area::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::NotFound {
                entity: "area",
                id: id.0,
            });
        }
        let removed: Vec<i64> = departamento::Entity::find()
            .filter(departamento::Column::AreaId.eq(id.0))
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|departamento| departamento.id)
            .collect();

        trabajador::Entity::update_many()
            .col_expr(trabajador::Column::AreaId, Expr::value(Option::<i64>::None))
            .filter(trabajador::Column::AreaId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        if !removed.is_empty() {
            trabajador::Entity::update_many()
                .col_expr(
                    trabajador::Column::DepartamentoId,
                    Expr::value(Option::<i64>::None),
                )
                .filter(trabajador::Column::DepartamentoId.is_in(removed.clone()))
                .exec(&txn)
                .await
                .map_err(unavailable)?;
            departamento::Entity::delete_many()
                .filter(departamento::Column::Id.is_in(removed))
                .exec(&txn)
                .await
                .map_err(unavailable)?;
        }
        area::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)
    }

    async fn area_rows(&self) -> Result<Vec<AreaRow>, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let areas = area::Entity::find()
            .order_by_asc(area::Column::Id)
            .all(&txn)
            .await
            .map_err(unavailable)?;
        let departamentos = departamento::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?;
        let workers = trabajador::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)?;

        Ok(areas
            .into_iter()
            .map(|model| AreaRow {
                num_departamentos: departamentos
                    .iter()
                    .filter(|departamento| departamento.area_id == model.id)
                    .count(),
                num_trabajadores: workers
                    .iter()
                    .filter(|worker| worker.area_id == Some(model.id))
                    .count(),
                area: area_of(model),
            })
            .collect())
    }

    async fn insert_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let departamento = push_departamento(&txn, nombre, area_id).await?;
        txn.commit().await.map_err(unavailable)?;
        Ok(departamento)
    }

    async fn get_or_create_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<(Departamento, bool), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let existing = departamento::Entity::find()
            .filter(departamento::Column::Nombre.eq(nombre))
            .filter(departamento::Column::AreaId.eq(area_id.0))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        let outcome = match existing {
            Some(model) => (departamento_of(model), false),
            None => (push_departamento(&txn, nombre, area_id).await?, true),
        };
        txn.commit().await.map_err(unavailable)?;
        Ok(outcome)
    }

    async fn fetch_departamento(
        &self,
        id: DepartamentoId,
    ) -> Result<Option<Departamento>, StoreError> {
        Ok(departamento::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(departamento_of))
    }

    async fn update_departamento(
        &self,
        id: DepartamentoId,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if area::Entity::find_by_id(area_id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::ForeignKey {
                entity: "departamento",
                field: "area",
            });
        }
        let clash = departamento::Entity::find()
            .filter(departamento::Column::Nombre.eq(nombre))
            .filter(departamento::Column::AreaId.eq(area_id.0))
            .filter(departamento::Column::Id.ne(id.0))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        if clash.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "departamento",
                field: "nombre",
            });
        }
        let model = departamento::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound {
                entity: "departamento",
                id: id.0,
            })?;
        let mut active: departamento::ActiveModel = model.into();
        active.nombre = Set(nombre.to_string());
        active.area_id = Set(area_id.0);
        let model = active
            .update(&txn)
            .await
            .map_err(|err| write_error(err, "departamento", "nombre"))?;
        txn.commit().await.map_err(unavailable)?;
        Ok(departamento_of(model))
    }

    async fn delete_departamento(&self, id: DepartamentoId) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if departamento::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::NotFound {
                entity: "departamento",
                id: id.0,
            });
        }
        trabajador::Entity::update_many()
            .col_expr(
                trabajador::Column::DepartamentoId,
                Expr::value(Option::<i64>::None),
            )
            .filter(trabajador::Column::DepartamentoId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        departamento::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)
    }

    async fn departamento_rows(&self) -> Result<Vec<DepartamentoRow>, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let departamentos = departamento::Entity::find()
            .order_by_asc(departamento::Column::Id)
            .all(&txn)
            .await
            .map_err(unavailable)?;
        let areas: BTreeMap<i64, String> = area::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|area| (area.id, area.nombre))
            .collect();
        let workers = trabajador::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)?;

        Ok(departamentos
            .into_iter()
            .map(|model| DepartamentoRow {
                area_nombre: areas.get(&model.area_id).cloned().unwrap_or_default(),
                num_trabajadores: workers
                    .iter()
                    .filter(|worker| worker.departamento_id == Some(model.id))
                    .count(),
                departamento: departamento_of(model),
            })
            .collect())
    }

    async fn insert_cargo(&self, nombre: &str) -> Result<Cargo, StoreError> {
        let taken = cargo::Entity::find()
            .filter(cargo::Column::Nombre.eq(nombre))
            .one(&self.db)
            .await
            .map_err(unavailable)?;
        if taken.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "cargo",
                field: "nombre",
            });
        }
        let model = cargo::ActiveModel {
            nombre: Set(nombre.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| write_error(err, "cargo", "nombre"))?;
        Ok(cargo_of(model))
    }

    async fn get_or_create_cargo(&self, nombre: &str) -> Result<(Cargo, bool), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let existing = cargo::Entity::find()
            .filter(cargo::Column::Nombre.eq(nombre))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        let outcome = match existing {
            Some(model) => (cargo_of(model), false),
            None => {
                let model = cargo::ActiveModel {
                    nombre: Set(nombre.to_string()),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|err| write_error(err, "cargo", "nombre"))?;
                (cargo_of(model), true)
            }
        };
        txn.commit().await.map_err(unavailable)?;
        Ok(outcome)
    }

    async fn fetch_cargo(&self, id: CargoId) -> Result<Option<Cargo>, StoreError> {
        Ok(cargo::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(cargo_of))
    }

    async fn rename_cargo(&self, id: CargoId, nombre: &str) -> Result<Cargo, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let clash = cargo::Entity::find()
            .filter(cargo::Column::Nombre.eq(nombre))
            .filter(cargo::Column::Id.ne(id.0))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        if clash.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "cargo",
                field: "nombre",
            });
        }
        let model = cargo::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound {
                entity: "cargo",
                id: id.0,
            })?;
        let mut active: cargo::ActiveModel = model.into();
        active.nombre = Set(nombre.to_string());
        let model = active
            .update(&txn)
            .await
            .map_err(|err| write_error(err, "cargo", "nombre"))?;
        txn.commit().await.map_err(unavailable)?;
        Ok(cargo_of(model))
    }

    async fn delete_cargo(&self, id: CargoId) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if cargo::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::NotFound {
                entity: "cargo",
                id: id.0,
            });
        }
        trabajador::Entity::update_many()
            .col_expr(trabajador::Column::CargoId, Expr::value(Option::<i64>::None))
            .filter(trabajador::Column::CargoId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        cargo::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)
    }

    async fn cargo_rows(&self) -> Result<Vec<CargoRow>, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let cargos = cargo::Entity::find()
            .order_by_asc(cargo::Column::Id)
            .all(&txn)
            .await
            .map_err(unavailable)?;
        let workers = trabajador::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)?;

        Ok(cargos
            .into_iter()
            .map(|model| CargoRow {
                num_trabajadores: workers
                    .iter()
                    .filter(|worker| worker.cargo_id == Some(model.id))
                    .count(),
                cargo: cargo_of(model),
            })
            .collect())
    }

    async fn catalog_counts(&self) -> Result<CatalogCounts, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let counts = CatalogCounts {
            areas: count(area::Entity::find().count(&txn).await.map_err(unavailable)?),
            departamentos: count(
                departamento::Entity::find()
                    .count(&txn)
                    .await
                    .map_err(unavailable)?,
            ),
            cargos: count(cargo::Entity::find().count(&txn).await.map_err(unavailable)?),
        };
        txn.commit().await.map_err(unavailable)?;
        Ok(counts)
    }
}

async fn push_departamento<C: ConnectionTrait>(
    conn: &C,
    nombre: &str,
    area_id: AreaId,
) -> Result<Departamento, StoreError> {
    if area::Entity::find_by_id(area_id.0)
        .one(conn)
        .await
        .map_err(unavailable)?
        .is_none()
    {
        return Err(StoreError::ForeignKey {
            entity: "departamento",
            field: "area",
        });
    }
    let taken = departamento::Entity::find()
        .filter(departamento::Column::Nombre.eq(nombre))
        .filter(departamento::Column::AreaId.eq(area_id.0))
        .one(conn)
        .await
        .map_err(unavailable)?;
    if taken.is_some() {
        return Err(StoreError::DuplicateKey {
            entity: "departamento",
            field: "nombre",
        });
    }
    let model = departamento::ActiveModel {
        nombre: Set(nombre.to_string()),
        area_id: Set(area_id.0),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| write_error(err, "departamento", "nombre"))?;
    Ok(departamento_of(model))
}

#[async_trait]
impl WorkerRepository for SeaOrmStore {
    async fn insert_worker(
        &self,
        identity_id: IdentityId,
        worker: NewTrabajador,
        contactos: Vec<ContactoFields>,
        cargas: Vec<CargaFields>,
    ) -> Result<Trabajador, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let worker = push_worker(&txn, identity_id, worker).await?;
        for contacto in contactos {
            push_contacto(&txn, worker.id, contacto).await?;
        }
        for carga in cargas {
            push_carga(&txn, worker.id, carga).await?;
        }
        txn.commit().await.map_err(unavailable)?;
        Ok(worker)
    }

    async fn fetch_worker(&self, id: WorkerId) -> Result<Option<Trabajador>, StoreError> {
        Ok(trabajador::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(worker_of))
    }

    async fn worker_for_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<Trabajador>, StoreError> {
        Ok(trabajador::Entity::find()
            .filter(trabajador::Column::IdentityId.eq(identity_id.0))
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(worker_of))
    }

    async fn workers(&self) -> Result<Vec<Trabajador>, StoreError> {
        Ok(trabajador::Entity::find()
            .order_by_asc(trabajador::Column::Id)
            .all(&self.db)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(worker_of)
            .collect())
    }

    async fn worker_rows(&self) -> Result<Vec<WorkerRow>, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let workers = trabajador::Entity::find()
            .order_by_asc(trabajador::Column::Id)
            .all(&txn)
            .await
            .map_err(unavailable)?;
        let usernames: BTreeMap<i64, String> = identity::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|identity| (identity.id, identity.username))
            .collect();
        let areas: BTreeMap<i64, String> = area::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|area| (area.id, area.nombre))
            .collect();
        let departamentos: BTreeMap<i64, String> = departamento::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|departamento| (departamento.id, departamento.nombre))
            .collect();
        let cargos: BTreeMap<i64, String> = cargo::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|cargo| (cargo.id, cargo.nombre))
            .collect();
        txn.commit().await.map_err(unavailable)?;

        Ok(workers
            .into_iter()
            .map(worker_of)
            .map(|worker| WorkerRow {
                username: usernames
                    .get(&worker.identity_id.0)
                    .cloned()
                    .unwrap_or_default(),
                area_nombre: worker.area_id.and_then(|id| areas.get(&id.0).cloned()),
                departamento_nombre: worker
                    .departamento_id
                    .and_then(|id| departamentos.get(&id.0).cloned()),
                cargo_nombre: worker.cargo_id.and_then(|id| cargos.get(&id.0).cloned()),
                trabajador: worker,
            })
            .collect())
    }

    async fn replace_worker(&self, worker: Trabajador) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let model = trabajador::Entity::find_by_id(worker.id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound {
                entity: "trabajador",
                id: worker.id.0,
            })?;
        if identity::Entity::find_by_id(worker.identity_id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::ForeignKey {
                entity: "trabajador",
                field: "identity",
            });
        }
        let clash = trabajador::Entity::find()
            .filter(trabajador::Column::IdentityId.eq(worker.identity_id.0))
            .filter(trabajador::Column::Id.ne(worker.id.0))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        if clash.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "trabajador",
                field: "identity",
            });
        }
        check_worker_refs(&txn, worker.area_id, worker.departamento_id, worker.cargo_id).await?;

        let mut active: trabajador::ActiveModel = model.into();
        active.identity_id = Set(worker.identity_id.0);
        active.nombres = Set(worker.nombres);
        active.apellidos = Set(worker.apellidos);
        active.rut = Set(worker.rut);
        active.sexo = Set(worker.sexo.code().to_string());
        active.fecha_ingreso = Set(worker.fecha_ingreso);
        active.area_id = Set(worker.area_id.map(|id| id.0));
        active.departamento_id = Set(worker.departamento_id.map(|id| id.0));
        active.cargo_id = Set(worker.cargo_id.map(|id| id.0));
        active.telefono = Set(worker.telefono);
        active.direccion = Set(worker.direccion);
        active
            .update(&txn)
            .await
            .map_err(|err| write_error(err, "trabajador", "identity"))?;
        txn.commit().await.map_err(unavailable)
    }

    async fn apply_profile_update(
        &self,
        id: WorkerId,
        update: ProfileUpdate,
    ) -> Result<Trabajador, StoreError> {
        let ProfileUpdate {
            personal,
            contactos,
            cargas,
        } = update;

        let txn = self.db.begin().await.map_err(unavailable)?;
        let model = trabajador::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound {
                entity: "trabajador",
                id: id.0,
            })?;
        let mut active: trabajador::ActiveModel = model.into();
        active.nombres = Set(personal.nombres);
        active.apellidos = Set(personal.apellidos);
        active.sexo = Set(personal.sexo.code().to_string());
        active.rut = Set(personal.rut);
        active.fecha_ingreso = Set(personal.fecha_ingreso);
        active.telefono = Set(personal.telefono);
        active.direccion = Set(personal.direccion);
        let updated = active.update(&txn).await.map_err(unavailable)?;

        for write in contactos {
            match write {
                RowWrite::Insert(fields) => push_contacto(&txn, id, fields).await?,
                RowWrite::Update(contacto_id, fields) => {
                    let mut active: contacto::ActiveModel =
                        owned_contacto(&txn, id, contacto_id).await?.into();
                    active.nombre = Set(fields.nombre);
                    active.parentesco = Set(fields.parentesco);
                    active.telefono = Set(fields.telefono);
                    active.update(&txn).await.map_err(unavailable)?;
                }
                RowWrite::Delete(contacto_id) => {
                    owned_contacto(&txn, id, contacto_id).await?;
                    contacto::Entity::delete_by_id(contacto_id.0)
                        .exec(&txn)
                        .await
                        .map_err(unavailable)?;
                }
            }
        }

        for write in cargas {
            match write {
                RowWrite::Insert(fields) => {
                    push_carga(&txn, id, fields).await?;
                }
                RowWrite::Update(carga_id, fields) => {
                    let mut active: carga::ActiveModel =
                        owned_carga(&txn, id, carga_id).await?.into();
                    active.nombre = Set(fields.nombre);
                    active.parentesco = Set(fields.parentesco);
                    active.fecha_nacimiento = Set(fields.fecha_nacimiento);
                    active.update(&txn).await.map_err(unavailable)?;
                }
                RowWrite::Delete(carga_id) => {
                    owned_carga(&txn, id, carga_id).await?;
                    carga::Entity::delete_by_id(carga_id.0)
                        .exec(&txn)
                        .await
                        .map_err(unavailable)?;
                }
            }
        }

        txn.commit().await.map_err(unavailable)?;
        Ok(worker_of(updated))
    }

    async fn delete_worker(&self, id: WorkerId) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if trabajador::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::NotFound {
                entity: "trabajador",
                id: id.0,
            });
        }
        remove_workers(&txn, vec![id.0]).await?;
        txn.commit().await.map_err(unavailable)
    }

    async fn contactos(&self, id: WorkerId) -> Result<Vec<ContactoEmergencia>, StoreError> {
        Ok(contacto::Entity::find()
            .filter(contacto::Column::TrabajadorId.eq(id.0))
            .order_by_asc(contacto::Column::Id)
            .all(&self.db)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(contacto_of)
            .collect())
    }

    async fn cargas(&self, id: WorkerId) -> Result<Vec<CargaFamiliar>, StoreError> {
        Ok(carga::Entity::find()
            .filter(carga::Column::TrabajadorId.eq(id.0))
            .order_by_asc(carga::Column::Id)
            .all(&self.db)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(carga_of)
            .collect())
    }

    async fn insert_carga(
        &self,
        id: WorkerId,
        carga: CargaFields,
    ) -> Result<CargaFamiliar, StoreError> {
        if trabajador::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::ForeignKey {
                entity: "carga_familiar",
                field: "trabajador",
            });
        }
        push_carga(&self.db, id, carga).await
    }

    async fn delete_all_cargas(&self) -> Result<usize, StoreError> {
        let result = carga::Entity::delete_many()
            .exec(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(count(result.rows_affected))
    }

    async fn count_workers(&self) -> Result<usize, StoreError> {
        Ok(count(
            trabajador::Entity::find()
                .count(&self.db)
                .await
                .map_err(unavailable)?,
        ))
    }
}

#[async_trait]
impl IdentityRepository for SeaOrmStore {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let identity = push_identity(&txn, identity).await?;
        txn.commit().await.map_err(unavailable)?;
        Ok(identity)
    }

    async fn register_identity(
        &self,
        identity: NewIdentity,
        worker: Option<NewTrabajador>,
    ) -> Result<(Identity, Option<Trabajador>), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let identity = push_identity(&txn, identity).await?;
        let worker = match worker {
            Some(worker) => Some(push_worker(&txn, identity.id, worker).await?),
            None => None,
        };
        txn.commit().await.map_err(unavailable)?;
        Ok((identity, worker))
    }

    async fn fetch_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        let Some(model) = identity::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(unavailable)?
        else {
            return Ok(None);
        };
        load_identity(&self.db, model).await.map(Some)
    }

    async fn identity_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let Some(model) = identity::Entity::find()
            .filter(identity::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(unavailable)?
        else {
            return Ok(None);
        };
        load_identity(&self.db, model).await.map(Some)
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let needle = email.trim().to_lowercase();
        let Some(model) = identity::Entity::find()
            .filter(Expr::expr(Func::lower(Expr::col(identity::Column::Email))).eq(needle))
            .order_by_asc(identity::Column::Id)
            .one(&self.db)
            .await
            .map_err(unavailable)?
        else {
            return Ok(None);
        };
        load_identity(&self.db, model).await.map(Some)
    }

    async fn identities(&self) -> Result<Vec<Identity>, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let models = identity::Entity::find()
            .order_by_asc(identity::Column::Id)
            .all(&txn)
            .await
            .map_err(unavailable)?;
        let names: BTreeMap<i64, String> = group::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|group| (group.id, group.name))
            .collect();
        let mut memberships: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
        for membership in identity_group::Entity::find()
            .all(&txn)
            .await
            .map_err(unavailable)?
        {
            if let Some(name) = names.get(&membership.group_id) {
                memberships
                    .entry(membership.identity_id)
                    .or_default()
                    .insert(name.clone());
            }
        }
        txn.commit().await.map_err(unavailable)?;

        Ok(models
            .into_iter()
            .map(|model| {
                let groups = memberships.remove(&model.id).unwrap_or_default();
                identity_of(model, groups)
            })
            .collect())
    }

    async fn replace_identity(&self, identity: Identity) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let model = identity::Entity::find_by_id(identity.id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound {
                entity: "identity",
                id: identity.id.0,
            })?;
        let clash = identity::Entity::find()
            .filter(identity::Column::Username.eq(identity.username.as_str()))
            .filter(identity::Column::Id.ne(identity.id.0))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        if clash.is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "identity",
                field: "username",
            });
        }
        let ids = group_ids(&txn, &identity.groups).await?;

        let mut active: identity::ActiveModel = model.into();
        active.username = Set(identity.username);
        active.email = Set(identity.email);
        active.password_hash = Set(identity.password_hash);
        active.is_superuser = Set(identity.is_superuser);
        active.is_staff = Set(identity.is_staff);
        active.date_joined = Set(identity.date_joined);
        active
            .update(&txn)
            .await
            .map_err(|err| write_error(err, "identity", "username"))?;
        set_memberships(&txn, identity.id.0, ids).await?;
        txn.commit().await.map_err(unavailable)
    }

    async fn delete_identity(&self, id: IdentityId) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if identity::Entity::find_by_id(id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::NotFound {
                entity: "identity",
                id: id.0,
            });
        }
        let owned: Vec<i64> = trabajador::Entity::find()
            .filter(trabajador::Column::IdentityId.eq(id.0))
            .all(&txn)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|worker| worker.id)
            .collect();
        remove_workers(&txn, owned).await?;
        session::Entity::delete_many()
            .filter(session::Column::IdentityId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        identity_group::Entity::delete_many()
            .filter(identity_group::Column::IdentityId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        identity::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)
    }

    async fn ensure_group(&self, name: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        let existing = group::Entity::find()
            .filter(group::Column::Name.eq(name))
            .one(&txn)
            .await
            .map_err(unavailable)?;
        if existing.is_some() {
            return Ok(false);
        }
        group::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|err| write_error(err, "group", "name"))?;
        txn.commit().await.map_err(unavailable)?;
        Ok(true)
    }

    async fn group_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(group::Entity::find()
            .filter(group::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .is_some())
    }

    async fn groups(&self) -> Result<Vec<String>, StoreError> {
        Ok(group::Entity::find()
            .order_by_asc(group::Column::Name)
            .all(&self.db)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|group| group.name)
            .collect())
    }

    async fn count_identities(&self) -> Result<usize, StoreError> {
        Ok(count(
            identity::Entity::find()
                .count(&self.db)
                .await
                .map_err(unavailable)?,
        ))
    }
}

#[async_trait]
impl SessionRepository for SeaOrmStore {
    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        if identity::Entity::find_by_id(session.identity_id.0)
            .one(&txn)
            .await
            .map_err(unavailable)?
            .is_none()
        {
            return Err(StoreError::ForeignKey {
                entity: "session",
                field: "identity",
            });
        }
        session::ActiveModel {
            token: Set(session.token),
            identity_id: Set(session.identity_id.0),
            created_at: Set(to_epoch(session.created_at)),
            expires_at: Set(to_epoch(session.expires_at)),
        }
        .insert(&txn)
        .await
        .map_err(|err| write_error(err, "session", "token"))?;
        txn.commit().await.map_err(unavailable)
    }

    async fn fetch_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(session::Entity::find_by_id(token.to_string())
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(session_of))
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let result = session::Entity::delete_by_id(token.to_string())
            .exec(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_sessions_for(&self, identity_id: IdentityId) -> Result<usize, StoreError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::IdentityId.eq(identity_id.0))
            .exec(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(count(result.rows_affected))
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(to_epoch(now)))
            .exec(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(count(result.rows_affected))
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

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
    NewTrabajador, ProfileUpdate, RowWrite, Trabajador, WorkerId, WorkerRow,
};

/// In-process relational store.
///
/// Writes run against a staged copy of the tables that replaces the live copy only when the
/// whole operation succeeds, which gives every repository write transaction semantics. Rows are
/// kept in id order, matching the insertion order of an auto-increment key. The lock is never
/// held across an await point.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    areas: BTreeMap<AreaId, Area>,
    departamentos: BTreeMap<DepartamentoId, Departamento>,
    cargos: BTreeMap<CargoId, Cargo>,
    identities: BTreeMap<IdentityId, Identity>,
    groups: BTreeSet<String>,
    workers: BTreeMap<WorkerId, Trabajador>,
    contactos: BTreeMap<ContactoId, ContactoEmergencia>,
    cargas: BTreeMap<CargaId, CargaFamiliar>,
    sessions: BTreeMap<String, Session>,
    sequence: Sequence,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sequence {
    areas: i64,
    departamentos: i64,
    cargos: i64,
    identities: i64,
    workers: i64,
    contactos: i64,
    cargas: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let value = f(&mut staged)?;
        *guard = staged;
        Ok(value)
    }
}

impl Tables {
    fn area_named(&self, nombre: &str) -> Option<&Area> {
        self.areas.values().find(|area| area.nombre == nombre)
    }

    fn cargo_named(&self, nombre: &str) -> Option<&Cargo> {
        self.cargos.values().find(|cargo| cargo.nombre == nombre)
    }

    fn departamento_keyed(&self, nombre: &str, area_id: AreaId) -> Option<&Departamento> {
        self.departamentos
            .values()
            .find(|departamento| departamento.nombre == nombre && departamento.area_id == area_id)
    }

    fn push_area(&mut self, nombre: &str) -> Result<Area, StoreError> {
        if self.area_named(nombre).is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "area",
                field: "nombre",
            });
        }
        let area = Area {
            id: AreaId(next(&mut self.sequence.areas)),
            nombre: nombre.to_string(),
        };
        self.areas.insert(area.id, area.clone());
        Ok(area)
    }

    fn push_departamento(
        &mut self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError> {
        if !self.areas.contains_key(&area_id) {
            return Err(StoreError::ForeignKey {
                entity: "departamento",
                field: "area",
            });
        }
        if self.departamento_keyed(nombre, area_id).is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "departamento",
                field: "nombre",
            });
        }
        let departamento = Departamento {
            id: DepartamentoId(next(&mut self.sequence.departamentos)),
            nombre: nombre.to_string(),
            area_id,
        };
        self.departamentos
            .insert(departamento.id, departamento.clone());
        Ok(departamento)
    }

    fn push_cargo(&mut self, nombre: &str) -> Result<Cargo, StoreError> {
        if self.cargo_named(nombre).is_some() {
            return Err(StoreError::DuplicateKey {
                entity: "cargo",
                field: "nombre",
            });
        }
        let cargo = Cargo {
            id: CargoId(next(&mut self.sequence.cargos)),
            nombre: nombre.to_string(),
        };
        self.cargos.insert(cargo.id, cargo.clone());
        Ok(cargo)
    }

    fn check_worker_refs(
        &self,
        area_id: Option<AreaId>,
        departamento_id: Option<DepartamentoId>,
        cargo_id: Option<CargoId>,
    ) -> Result<(), StoreError> {
        if area_id.is_some_and(|id| !self.areas.contains_key(&id)) {
            return Err(StoreError::ForeignKey {
                entity: "trabajador",
                field: "area",
            });
        }
        if departamento_id.is_some_and(|id| !self.departamentos.contains_key(&id)) {
            return Err(StoreError::ForeignKey {
                entity: "trabajador",
                field: "departamento",
            });
        }
        if cargo_id.is_some_and(|id| !self.cargos.contains_key(&id)) {
            return Err(StoreError::ForeignKey {
                entity: "trabajador",
                field: "cargo",
            });
        }
        Ok(())
    }

    fn check_groups(&self, groups: &BTreeSet<String>) -> Result<(), StoreError> {
        if groups.iter().all(|group| self.groups.contains(group)) {
            Ok(())
        } else {
            Err(StoreError::ForeignKey {
                entity: "identity",
                field: "groups",
            })
        }
    }

    fn push_identity(&mut self, new: NewIdentity) -> Result<Identity, StoreError> {
        if self
            .identities
            .values()
            .any(|identity| identity.username == new.username)
        {
            return Err(StoreError::DuplicateKey {
                entity: "identity",
                field: "username",
            });
        }
        self.check_groups(&new.groups)?;

        let identity = Identity {
            id: IdentityId(next(&mut self.sequence.identities)),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_superuser: new.is_superuser,
            is_staff: new.is_staff,
            groups: new.groups,
            date_joined: new.date_joined,
        };
        self.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    fn push_worker(
        &mut self,
        identity_id: IdentityId,
        new: NewTrabajador,
    ) -> Result<Trabajador, StoreError> {
        if !self.identities.contains_key(&identity_id) {
            return Err(StoreError::ForeignKey {
                entity: "trabajador",
                field: "identity",
            });
        }
        if self
            .workers
            .values()
            .any(|worker| worker.identity_id == identity_id)
        {
            return Err(StoreError::DuplicateKey {
                entity: "trabajador",
                field: "identity",
            });
        }
        self.check_worker_refs(new.area_id, new.departamento_id, new.cargo_id)?;

        let worker = Trabajador {
            id: WorkerId(next(&mut self.sequence.workers)),
            identity_id,
            nombres: new.nombres,
            apellidos: new.apellidos,
            rut: new.rut,
            sexo: new.sexo,
            fecha_ingreso: new.fecha_ingreso,
            area_id: new.area_id,
            departamento_id: new.departamento_id,
            cargo_id: new.cargo_id,
            telefono: new.telefono,
            direccion: new.direccion,
        };
        self.workers.insert(worker.id, worker.clone());
        Ok(worker)
    }

    fn push_contacto(&mut self, trabajador_id: WorkerId, fields: ContactoFields) -> ContactoId {
        let id = ContactoId(next(&mut self.sequence.contactos));
        self.contactos.insert(
            id,
            ContactoEmergencia {
                id,
                trabajador_id,
                nombre: fields.nombre,
                parentesco: fields.parentesco,
                telefono: fields.telefono,
            },
        );
        id
    }

    fn push_carga(&mut self, trabajador_id: WorkerId, fields: CargaFields) -> CargaFamiliar {
        let carga = CargaFamiliar {
            id: CargaId(next(&mut self.sequence.cargas)),
            trabajador_id,
            nombre: fields.nombre,
            parentesco: fields.parentesco,
            fecha_nacimiento: fields.fecha_nacimiento,
        };
        self.cargas.insert(carga.id, carga.clone());
        carga
    }

    fn owned_contacto(
        &mut self,
        trabajador_id: WorkerId,
        id: ContactoId,
    ) -> Result<&mut ContactoEmergencia, StoreError> {
        self.contactos
            .get_mut(&id)
            .filter(|contacto| contacto.trabajador_id == trabajador_id)
            .ok_or(StoreError::NotFound {
                entity: "contacto_emergencia",
                id: id.0,
            })
    }

    fn owned_carga(
        &mut self,
        trabajador_id: WorkerId,
        id: CargaId,
    ) -> Result<&mut CargaFamiliar, StoreError> {
        self.cargas
            .get_mut(&id)
            .filter(|carga| carga.trabajador_id == trabajador_id)
            .ok_or(StoreError::NotFound {
                entity: "carga_familiar",
                id: id.0,
            })
    }

    fn remove_worker(&mut self, id: WorkerId) {
        self.workers.remove(&id);
        self.contactos
            .retain(|_, contacto| contacto.trabajador_id != id);
        self.cargas.retain(|_, carga| carga.trabajador_id != id);
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn insert_area(&self, nombre: &str) -> Result<Area, StoreError> {
        self.write(|tables| tables.push_area(nombre))
    }

    async fn get_or_create_area(&self, nombre: &str) -> Result<(Area, bool), StoreError> {
        self.write(|tables| match tables.area_named(nombre) {
            Some(area) => Ok((area.clone(), false)),
            None => tables.push_area(nombre).map(|area| (area, true)),
        })
    }

    async fn fetch_area(&self, id: AreaId) -> Result<Option<Area>, StoreError> {
        self.read(|tables| tables.areas.get(&id).cloned())
    }

    async fn rename_area(&self, id: AreaId, nombre: &str) -> Result<Area, StoreError> {
        self.write(|tables| {
            if tables
                .area_named(nombre)
                .is_some_and(|existing| existing.id != id)
            {
                return Err(StoreError::DuplicateKey {
                    entity: "area",
                    field: "nombre",
                });
            }
            let area = tables.areas.get_mut(&id).ok_or(StoreError::NotFound {
                entity: "area",
                id: id.0,
            })?;
            area.nombre = nombre.to_string();
            Ok(area.clone())
        })
    }

    async fn delete_area(&self, id: AreaId) -> Result<(), StoreError> {
        self.write(|tables| {
            tables.areas.remove(&id).ok_or(StoreError::NotFound {
                entity: "area",
                id: id.0,
            })?;

            let removed: BTreeSet<DepartamentoId> = tables
                .departamentos
                .values()
                .filter(|departamento| departamento.area_id == id)
                .map(|departamento| departamento.id)
                .collect();
            tables
                .departamentos
                .retain(|departamento_id, _| !removed.contains(departamento_id));

            for worker in tables.workers.values_mut() {
                if worker.area_id == Some(id) {
                    worker.area_id = None;
                }
                if worker
                    .departamento_id
                    .is_some_and(|departamento_id| removed.contains(&departamento_id))
                {
                    worker.departamento_id = None;
                }
            }
            Ok(())
        })
    }

    async fn area_rows(&self) -> Result<Vec<AreaRow>, StoreError> {
        self.read(|tables| {
            tables
                .areas
                .values()
                .map(|area| AreaRow {
                    area: area.clone(),
                    num_departamentos: tables
                        .departamentos
                        .values()
                        .filter(|departamento| departamento.area_id == area.id)
                        .count(),
                    num_trabajadores: tables
                        .workers
                        .values()
                        .filter(|worker| worker.area_id == Some(area.id))
                        .count(),
                })
                .collect()
        })
    }

    async fn insert_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError> {
        self.write(|tables| tables.push_departamento(nombre, area_id))
    }

    async fn get_or_create_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<(Departamento, bool), StoreError> {
        self.write(|tables| match tables.departamento_keyed(nombre, area_id) {
            Some(departamento) => Ok((departamento.clone(), false)),
            None => tables
                .push_departamento(nombre, area_id)
                .map(|departamento| (departamento, true)),
        })
    }

    async fn fetch_departamento(
        &self,
        id: DepartamentoId,
    ) -> Result<Option<Departamento>, StoreError> {
        self.read(|tables| tables.departamentos.get(&id).cloned())
    }

    async fn update_departamento(
        &self,
        id: DepartamentoId,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, StoreError> {
        self.write(|tables| {
            if !tables.areas.contains_key(&area_id) {
                return Err(StoreError::ForeignKey {
                    entity: "departamento",
                    field: "area",
                });
            }
            if tables
                .departamento_keyed(nombre, area_id)
                .is_some_and(|existing| existing.id != id)
            {
                return Err(StoreError::DuplicateKey {
                    entity: "departamento",
                    field: "nombre",
                });
            }
            let departamento =
                tables
                    .departamentos
                    .get_mut(&id)
                    .ok_or(StoreError::NotFound {
                        entity: "departamento",
                        id: id.0,
                    })?;
            departamento.nombre = nombre.to_string();
            departamento.area_id = area_id;
            Ok(departamento.clone())
        })
    }

    async fn delete_departamento(&self, id: DepartamentoId) -> Result<(), StoreError> {
        self.write(|tables| {
            tables
                .departamentos
                .remove(&id)
                .ok_or(StoreError::NotFound {
                    entity: "departamento",
                    id: id.0,
                })?;
            for worker in tables.workers.values_mut() {
                if worker.departamento_id == Some(id) {
                    worker.departamento_id = None;
                }
            }
            Ok(())
        })
    }

    async fn departamento_rows(&self) -> Result<Vec<DepartamentoRow>, StoreError> {
        self.read(|tables| {
            tables
                .departamentos
                .values()
                .map(|departamento| DepartamentoRow {
                    departamento: departamento.clone(),
                    area_nombre: tables
                        .areas
                        .get(&departamento.area_id)
                        .map(|area| area.nombre.clone())
                        .unwrap_or_default(),
                    num_trabajadores: tables
                        .workers
                        .values()
                        .filter(|worker| worker.departamento_id == Some(departamento.id))
                        .count(),
                })
                .collect()
        })
    }

    async fn insert_cargo(&self, nombre: &str) -> Result<Cargo, StoreError> {
        self.write(|tables| tables.push_cargo(nombre))
    }

    async fn get_or_create_cargo(&self, nombre: &str) -> Result<(Cargo, bool), StoreError> {
        self.write(|tables| match tables.cargo_named(nombre) {
            Some(cargo) => Ok((cargo.clone(), false)),
            None => tables.push_cargo(nombre).map(|cargo| (cargo, true)),
        })
    }

    async fn fetch_cargo(&self, id: CargoId) -> Result<Option<Cargo>, StoreError> {
        self.read(|tables| tables.cargos.get(&id).cloned())
    }

    async fn rename_cargo(&self, id: CargoId, nombre: &str) -> Result<Cargo, StoreError> {
        self.write(|tables| {
            if tables
                .cargo_named(nombre)
                .is_some_and(|existing| existing.id != id)
            {
                return Err(StoreError::DuplicateKey {
                    entity: "cargo",
                    field: "nombre",
                });
            }
            let cargo = tables.cargos.get_mut(&id).ok_or(StoreError::NotFound {
                entity: "cargo",
                id: id.0,
            })?;
            cargo.nombre = nombre.to_string();
            Ok(cargo.clone())
        })
    }

    async fn delete_cargo(&self, id: CargoId) -> Result<(), StoreError> {
        self.write(|tables| {
            tables.cargos.remove(&id).ok_or(StoreError::NotFound {
                entity: "cargo",
                id: id.0,
            })?;
            for worker in tables.workers.values_mut() {
                if worker.cargo_id == Some(id) {
                    worker.cargo_id = None;
                }
            }
            Ok(())
        })
    }

    async fn cargo_rows(&self) -> Result<Vec<CargoRow>, StoreError> {
        self.read(|tables| {
            tables
                .cargos
                .values()
                .map(|cargo| CargoRow {
                    cargo: cargo.clone(),
                    num_trabajadores: tables
                        .workers
                        .values()
                        .filter(|worker| worker.cargo_id == Some(cargo.id))
                        .count(),
                })
                .collect()
        })
    }

    async fn catalog_counts(&self) -> Result<CatalogCounts, StoreError> {
        self.read(|tables| CatalogCounts {
            areas: tables.areas.len(),
            departamentos: tables.departamentos.len(),
            cargos: tables.cargos.len(),
        })
    }
}

#[async_trait]
impl WorkerRepository for MemoryStore {
    async fn insert_worker(
        &self,
        identity_id: IdentityId,
        worker: NewTrabajador,
        contactos: Vec<ContactoFields>,
        cargas: Vec<CargaFields>,
    ) -> Result<Trabajador, StoreError> {
        self.write(|tables| {
            let worker = tables.push_worker(identity_id, worker)?;
            for contacto in contactos {
                tables.push_contacto(worker.id, contacto);
            }
            for carga in cargas {
                tables.push_carga(worker.id, carga);
            }
            Ok(worker)
        })
    }

    async fn fetch_worker(&self, id: WorkerId) -> Result<Option<Trabajador>, StoreError> {
        self.read(|tables| tables.workers.get(&id).cloned())
    }

    async fn worker_for_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<Trabajador>, StoreError> {
        self.read(|tables| {
            tables
                .workers
                .values()
                .find(|worker| worker.identity_id == identity_id)
                .cloned()
        })
    }

    async fn workers(&self) -> Result<Vec<Trabajador>, StoreError> {
        self.read(|tables| tables.workers.values().cloned().collect())
    }

    async fn worker_rows(&self) -> Result<Vec<WorkerRow>, StoreError> {
        self.read(|tables| {
            tables
                .workers
                .values()
                .map(|worker| WorkerRow {
                    username: tables
                        .identities
                        .get(&worker.identity_id)
                        .map(|identity| identity.username.clone())
                        .unwrap_or_default(),
                    area_nombre: worker
                        .area_id
                        .and_then(|id| tables.areas.get(&id))
                        .map(|area| area.nombre.clone()),
                    departamento_nombre: worker
                        .departamento_id
                        .and_then(|id| tables.departamentos.get(&id))
                        .map(|departamento| departamento.nombre.clone()),
                    cargo_nombre: worker
                        .cargo_id
                        .and_then(|id| tables.cargos.get(&id))
                        .map(|cargo| cargo.nombre.clone()),
                    trabajador: worker.clone(),
                })
                .collect()
        })
    }

    async fn replace_worker(&self, worker: Trabajador) -> Result<(), StoreError> {
        self.write(|tables| {
            if !tables.workers.contains_key(&worker.id) {
                return Err(StoreError::NotFound {
                    entity: "trabajador",
                    id: worker.id.0,
                });
            }
            if !tables.identities.contains_key(&worker.identity_id) {
                return Err(StoreError::ForeignKey {
                    entity: "trabajador",
                    field: "identity",
                });
            }
            if tables
                .workers
                .values()
                .any(|other| other.identity_id == worker.identity_id && other.id != worker.id)
            {
                return Err(StoreError::DuplicateKey {
                    entity: "trabajador",
                    field: "identity",
                });
            }
            tables.check_worker_refs(worker.area_id, worker.departamento_id, worker.cargo_id)?;
            tables.workers.insert(worker.id, worker);
            Ok(())
        })
    }

    async fn apply_profile_update(
        &self,
        id: WorkerId,
        update: ProfileUpdate,
    ) -> Result<Trabajador, StoreError> {
        self.write(|tables| {
            let ProfileUpdate {
                personal,
                contactos,
                cargas,
            } = update;

            let worker = tables.workers.get_mut(&id).ok_or(StoreError::NotFound {
                entity: "trabajador",
                id: id.0,
            })?;
            worker.nombres = personal.nombres;
            worker.apellidos = personal.apellidos;
            worker.sexo = personal.sexo;
            worker.rut = personal.rut;
            worker.fecha_ingreso = personal.fecha_ingreso;
            worker.telefono = personal.telefono;
            worker.direccion = personal.direccion;
            let updated = worker.clone();

            for write in contactos {
                match write {
                    RowWrite::Insert(fields) => {
                        tables.push_contacto(id, fields);
                    }
                    RowWrite::Update(contacto_id, fields) => {
                        let contacto = tables.owned_contacto(id, contacto_id)?;
                        contacto.nombre = fields.nombre;
                        contacto.parentesco = fields.parentesco;
                        contacto.telefono = fields.telefono;
                    }
                    RowWrite::Delete(contacto_id) => {
                        tables.owned_contacto(id, contacto_id)?;
                        tables.contactos.remove(&contacto_id);
                    }
                }
            }

            for write in cargas {
                match write {
                    RowWrite::Insert(fields) => {
                        tables.push_carga(id, fields);
                    }
                    RowWrite::Update(carga_id, fields) => {
                        let carga = tables.owned_carga(id, carga_id)?;
                        carga.nombre = fields.nombre;
                        carga.parentesco = fields.parentesco;
                        carga.fecha_nacimiento = fields.fecha_nacimiento;
                    }
                    RowWrite::Delete(carga_id) => {
                        tables.owned_carga(id, carga_id)?;
                        tables.cargas.remove(&carga_id);
                    }
                }
            }

            Ok(updated)
        })
    }

    async fn delete_worker(&self, id: WorkerId) -> Result<(), StoreError> {
        self.write(|tables| {
            if !tables.workers.contains_key(&id) {
                return Err(StoreError::NotFound {
                    entity: "trabajador",
                    id: id.0,
                });
            }
            tables.remove_worker(id);
            Ok(())
        })
    }

    async fn contactos(&self, id: WorkerId) -> Result<Vec<ContactoEmergencia>, StoreError> {
        self.read(|tables| {
            tables
                .contactos
                .values()
                .filter(|contacto| contacto.trabajador_id == id)
                .cloned()
                .collect()
        })
    }

    async fn cargas(&self, id: WorkerId) -> Result<Vec<CargaFamiliar>, StoreError> {
        self.read(|tables| {
            tables
                .cargas
                .values()
                .filter(|carga| carga.trabajador_id == id)
                .cloned()
                .collect()
        })
    }

    async fn insert_carga(
        &self,
        id: WorkerId,
        carga: CargaFields,
    ) -> Result<CargaFamiliar, StoreError> {
        self.write(|tables| {
            if !tables.workers.contains_key(&id) {
                return Err(StoreError::ForeignKey {
                    entity: "carga_familiar",
                    field: "trabajador",
                });
            }
            Ok(tables.push_carga(id, carga))
        })
    }

    async fn delete_all_cargas(&self) -> Result<usize, StoreError> {
        self.write(|tables| {
            let deleted = tables.cargas.len();
            tables.cargas.clear();
            Ok(deleted)
        })
    }

    async fn count_workers(&self) -> Result<usize, StoreError> {
        self.read(|tables| tables.workers.len())
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        self.write(|tables| tables.push_identity(identity))
    }

    async fn register_identity(
        &self,
        identity: NewIdentity,
        worker: Option<NewTrabajador>,
    ) -> Result<(Identity, Option<Trabajador>), StoreError> {
        self.write(|tables| {
            let identity = tables.push_identity(identity)?;
            let worker = worker
                .map(|worker| tables.push_worker(identity.id, worker))
                .transpose()?;
            Ok((identity, worker))
        })
    }

    async fn fetch_identity(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        self.read(|tables| tables.identities.get(&id).cloned())
    }

    async fn identity_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.read(|tables| {
            tables
                .identities
                .values()
                .find(|identity| identity.username == username)
                .cloned()
        })
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let needle = email.trim().to_lowercase();
        self.read(|tables| {
            tables
                .identities
                .values()
                .find(|identity| identity.email.to_lowercase() == needle)
                .cloned()
        })
    }

    async fn identities(&self) -> Result<Vec<Identity>, StoreError> {
        self.read(|tables| tables.identities.values().cloned().collect())
    }

    async fn replace_identity(&self, identity: Identity) -> Result<(), StoreError> {
        self.write(|tables| {
            if !tables.identities.contains_key(&identity.id) {
                return Err(StoreError::NotFound {
                    entity: "identity",
                    id: identity.id.0,
                });
            }
            if tables
                .identities
                .values()
                .any(|other| other.username == identity.username && other.id != identity.id)
            {
                return Err(StoreError::DuplicateKey {
                    entity: "identity",
                    field: "username",
                });
            }
            tables.check_groups(&identity.groups)?;
            tables.identities.insert(identity.id, identity);
            Ok(())
        })
    }

    async fn delete_identity(&self, id: IdentityId) -> Result<(), StoreError> {
        self.write(|tables| {
            tables.identities.remove(&id).ok_or(StoreError::NotFound {
                entity: "identity",
                id: id.0,
            })?;
            let owned: Vec<WorkerId> = tables
                .workers
                .values()
                .filter(|worker| worker.identity_id == id)
                .map(|worker| worker.id)
                .collect();
            for worker_id in owned {
                tables.remove_worker(worker_id);
            }
            tables.sessions.retain(|_, session| session.identity_id != id);
            Ok(())
        })
    }

    async fn ensure_group(&self, name: &str) -> Result<bool, StoreError> {
        self.write(|tables| Ok(tables.groups.insert(name.to_string())))
    }

    async fn group_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.read(|tables| tables.groups.contains(name))
    }

    async fn groups(&self) -> Result<Vec<String>, StoreError> {
        self.read(|tables| tables.groups.iter().cloned().collect())
    }

    async fn count_identities(&self) -> Result<usize, StoreError> {
        self.read(|tables| tables.identities.len())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.write(|tables| {
            if !tables.identities.contains_key(&session.identity_id) {
                return Err(StoreError::ForeignKey {
                    entity: "session",
                    field: "identity",
                });
            }
            if tables.sessions.contains_key(&session.token) {
                return Err(StoreError::DuplicateKey {
                    entity: "session",
                    field: "token",
                });
            }
            tables.sessions.insert(session.token.clone(), session);
            Ok(())
        })
    }

    async fn fetch_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.read(|tables| tables.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        self.write(|tables| Ok(tables.sessions.remove(token).is_some()))
    }

    async fn delete_sessions_for(&self, identity_id: IdentityId) -> Result<usize, StoreError> {
        self.write(|tables| {
            let before = tables.sessions.len();
            tables
                .sessions
                .retain(|_, session| session.identity_id != identity_id);
            Ok(before - tables.sessions.len())
        })
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.write(|tables| {
            let before = tables.sessions.len();
            tables.sessions.retain(|_, session| !session.is_expired(now));
            Ok(before - tables.sessions.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::{PersonalFields, Sexo};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
    }

    async fn identity(store: &MemoryStore, username: &str) -> Identity {
        store
            .insert_identity(NewIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: String::new(),
                is_superuser: false,
                is_staff: false,
                groups: BTreeSet::new(),
                date_joined: today(),
            })
            .await
            .expect("identity inserts")
    }

    fn new_worker(nombres: &str) -> NewTrabajador {
        NewTrabajador {
            nombres: nombres.to_string(),
            apellidos: "Rojas".to_string(),
            rut: None,
            sexo: Sexo::Femenino,
            fecha_ingreso: Some(today()),
            area_id: None,
            departamento_id: None,
            cargo_id: None,
            telefono: String::new(),
            direccion: String::new(),
        }
    }

    fn contacto(nombre: &str) -> ContactoFields {
        ContactoFields {
            nombre: nombre.to_string(),
            parentesco: "Hermana".to_string(),
            telefono: "555-0101".to_string(),
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_no_trace() {
        let store = MemoryStore::new();
        let owner = identity(&store, "ana").await;
        let worker = store
            .insert_worker(owner.id, new_worker("Ana"), vec![contacto("Luz")], Vec::new())
            .await
            .expect("worker inserts");

        let update = ProfileUpdate {
            personal: PersonalFields {
                nombres: "Anita".to_string(),
                apellidos: "Rojas".to_string(),
                sexo: Sexo::Femenino,
                rut: None,
                fecha_ingreso: None,
                telefono: String::new(),
                direccion: String::new(),
            },
            contactos: vec![
                RowWrite::Insert(contacto("Mar")),
                RowWrite::Delete(ContactoId(999)),
            ],
            cargas: Vec::new(),
        };

        let error = store
            .apply_profile_update(worker.id, update)
            .await
            .expect_err("foreign contact id rejected");
        assert_eq!(
            error,
            StoreError::NotFound {
                entity: "contacto_emergencia",
                id: 999
            }
        );

        let stored = store
            .fetch_worker(worker.id)
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.nombres, "Ana");
        assert_eq!(store.contactos(worker.id).await.expect("contacts").len(), 1);
    }

    #[tokio::test]
    async fn contact_of_another_worker_is_not_reachable() {
        let store = MemoryStore::new();
        let first = identity(&store, "uno").await;
        let second = identity(&store, "dos").await;
        let a = store
            .insert_worker(first.id, new_worker("Uno"), vec![contacto("Luz")], Vec::new())
            .await
            .expect("worker a");
        let b = store
            .insert_worker(second.id, new_worker("Dos"), Vec::new(), Vec::new())
            .await
            .expect("worker b");
        let foreign = store.contactos(a.id).await.expect("contacts")[0].id;

        let update = ProfileUpdate {
            personal: PersonalFields {
                nombres: "Dos".to_string(),
                apellidos: "Rojas".to_string(),
                sexo: Sexo::Otro,
                rut: None,
                fecha_ingreso: None,
                telefono: String::new(),
                direccion: String::new(),
            },
            contactos: vec![RowWrite::Delete(foreign)],
            cargas: Vec::new(),
        };
        assert!(store.apply_profile_update(b.id, update).await.is_err());
        assert_eq!(store.contactos(a.id).await.expect("contacts").len(), 1);
    }

    #[tokio::test]
    async fn register_identity_rolls_back_when_worker_refs_are_missing() {
        let store = MemoryStore::new();
        let mut worker = new_worker("Eva");
        worker.cargo_id = Some(CargoId(42));

        let error = store
            .register_identity(
                NewIdentity {
                    username: "eva".to_string(),
                    email: "eva@example.com".to_string(),
                    password_hash: String::new(),
                    is_superuser: false,
                    is_staff: false,
                    groups: BTreeSet::new(),
                    date_joined: today(),
                },
                Some(worker),
            )
            .await
            .expect_err("missing cargo rejected");

        assert_eq!(
            error,
            StoreError::ForeignKey {
                entity: "trabajador",
                field: "cargo"
            }
        );
        assert_eq!(store.count_identities().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn identities_require_existing_groups() {
        let store = MemoryStore::new();
        let mut groups = BTreeSet::new();
        groups.insert("Administrador".to_string());
        let new = NewIdentity {
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            password_hash: String::new(),
            is_superuser: true,
            is_staff: true,
            groups,
            date_joined: today(),
        };

        assert!(store.insert_identity(new.clone()).await.is_err());
        assert!(store.ensure_group("Administrador").await.expect("group created"));
        assert!(!store.ensure_group("Administrador").await.expect("group exists"));
        assert!(store.insert_identity(new).await.is_ok());
    }

    #[tokio::test]
    async fn rename_rejects_names_held_by_other_rows() {
        let store = MemoryStore::new();
        let ti = store.insert_cargo("Analista").await.expect("cargo");
        store.insert_cargo("Operario").await.expect("cargo");

        assert_eq!(
            store.rename_cargo(ti.id, "Operario").await,
            Err(StoreError::DuplicateKey {
                entity: "cargo",
                field: "nombre"
            })
        );
        assert!(store.rename_cargo(ti.id, "Analista").await.is_ok(), "own name is free");
    }

    #[tokio::test]
    async fn deleting_an_identity_drops_its_sessions() {
        let store = MemoryStore::new();
        let owner = identity(&store, "ana").await;
        let now = Utc::now();
        store
            .insert_session(Session {
                token: "t1".to_string(),
                identity_id: owner.id,
                created_at: now,
                expires_at: now + chrono::Duration::hours(1),
            })
            .await
            .expect("session");

        store.delete_identity(owner.id).await.expect("delete");
        assert_eq!(store.fetch_session("t1").await.expect("fetch"), None);
    }
}

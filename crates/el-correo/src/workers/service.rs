use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::{info, warn};

use super::batch::{self, CargaRow, ContactoRow};
use super::domain::{
    NewTrabajador, PersonalFields, ProfileUpdate, Sexo, Trabajador, WorkerProfile,
};
use crate::catalog::{AreaId, CargoId, DepartamentoId};
use crate::error::ServiceError;
use crate::identity::{Identity, IdentityId};
use crate::store::{CatalogRepository, IdentityRepository, WorkerRepository};
use crate::validation::{self, FieldErrors, INVALID_CHOICE};

const NOMBRES_MAX_LEN: usize = 120;
const RUT_MAX_LEN: usize = 12;
const TELEFONO_MAX_LEN: usize = 30;
const DIRECCION_MAX_LEN: usize = 255;

pub(crate) const DEPARTAMENTO_OUTSIDE_AREA: &str =
    "El departamento no pertenece al área seleccionada.";

/// Placeholder surname for accounts provisioned through signup or user creation.
pub const SIGNUP_PLACEHOLDER: &str = "Usuario";

/// Today's date in the server's local calendar.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Partially known worker values that still need the fallback policy applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerDraft {
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
    pub sexo: Option<Sexo>,
    pub rut: Option<String>,
    pub fecha_ingreso: Option<NaiveDate>,
    pub area_id: Option<AreaId>,
    pub departamento_id: Option<DepartamentoId>,
    pub cargo_id: Option<CargoId>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl WorkerDraft {
    /// Fill every missing value: given names fall back to the account name, surnames to
    /// `placeholder`, sex to `O`, hire date to `today`.
    pub fn with_fallbacks(
        self,
        username: &str,
        placeholder: &str,
        today: NaiveDate,
    ) -> NewTrabajador {
        NewTrabajador {
            nombres: present(self.nombres).unwrap_or_else(|| username.to_string()),
            apellidos: present(self.apellidos).unwrap_or_else(|| placeholder.to_string()),
            rut: present(self.rut),
            sexo: self.sexo.unwrap_or(Sexo::Otro),
            fecha_ingreso: Some(self.fecha_ingreso.unwrap_or(today)),
            area_id: self.area_id,
            departamento_id: self.departamento_id,
            cargo_id: self.cargo_id,
            telefono: String::new(),
            direccion: String::new(),
        }
    }
}

/// Personal fields as submitted by the profile and intake forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonalForm {
    pub nombres: String,
    pub apellidos: String,
    pub sexo: String,
    pub rut: String,
    pub fecha_ingreso: Option<String>,
    pub telefono: String,
    pub direccion: String,
}

impl PersonalForm {
    pub(crate) fn validate(&self, errors: &mut FieldErrors) -> PersonalFields {
        let nombres = validation::required(errors, "nombres", &self.nombres, NOMBRES_MAX_LEN);
        let apellidos = validation::required(errors, "apellidos", &self.apellidos, NOMBRES_MAX_LEN);
        let sexo = parse_sexo(errors, &self.sexo).unwrap_or(Sexo::Otro);
        let rut = validation::optional(errors, "rut", &self.rut, RUT_MAX_LEN);
        let fecha_ingreso =
            batch::optional_date(errors, "fecha_ingreso", self.fecha_ingreso.as_deref());
        let telefono = validation::optional(errors, "telefono", &self.telefono, TELEFONO_MAX_LEN);
        let direccion =
            validation::optional(errors, "direccion", &self.direccion, DIRECCION_MAX_LEN);

        PersonalFields {
            nombres,
            apellidos,
            sexo,
            rut: Some(rut).filter(|rut| !rut.is_empty()),
            fecha_ingreso,
            telefono,
            direccion,
        }
    }
}

fn parse_sexo(errors: &mut FieldErrors, raw: &str) -> Option<Sexo> {
    if raw.trim().is_empty() {
        errors.add("sexo", validation::REQUIRED);
        return None;
    }
    let sexo = Sexo::from_code(raw);
    if sexo.is_none() {
        errors.add("sexo", INVALID_CHOICE);
    }
    sexo
}

/// Self-service profile submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    #[serde(flatten)]
    pub personal: PersonalForm,
    pub contactos: Vec<ContactoRow>,
    pub cargas: Vec<CargaRow>,
}

/// Administrative intake submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IntakeForm {
    #[serde(deserialize_with = "validation::optional_id")]
    pub identity: Option<i64>,
    #[serde(flatten)]
    pub personal: PersonalForm,
    #[serde(deserialize_with = "validation::optional_id")]
    pub area: Option<i64>,
    #[serde(deserialize_with = "validation::optional_id")]
    pub departamento: Option<i64>,
    #[serde(deserialize_with = "validation::optional_id")]
    pub cargo: Option<i64>,
    pub contactos: Vec<ContactoRow>,
    pub cargas: Vec<CargaRow>,
}

/// Validated optional placement of a worker in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub area_id: Option<AreaId>,
    pub departamento_id: Option<DepartamentoId>,
    pub cargo_id: Option<CargoId>,
}

/// Check that each referenced catalog row exists and that the department sits in the area.
pub(crate) async fn resolve_placement<S>(
    store: &S,
    errors: &mut FieldErrors,
    area: Option<i64>,
    departamento: Option<i64>,
    cargo: Option<i64>,
) -> Result<Placement, ServiceError>
where
    S: CatalogRepository + ?Sized,
{
    let area = match area {
        Some(id) => {
            let found = store.fetch_area(AreaId(id)).await?;
            if found.is_none() {
                errors.add("area", INVALID_CHOICE);
            }
            found
        }
        None => None,
    };
    let departamento = match departamento {
        Some(id) => {
            let found = store.fetch_departamento(DepartamentoId(id)).await?;
            if found.is_none() {
                errors.add("departamento", INVALID_CHOICE);
            }
            found
        }
        None => None,
    };
    let cargo = match cargo {
        Some(id) => {
            let found = store.fetch_cargo(CargoId(id)).await?;
            if found.is_none() {
                errors.add("cargo", INVALID_CHOICE);
            }
            found
        }
        None => None,
    };

    if let (Some(area), Some(departamento)) = (&area, &departamento) {
        if departamento.area_id != area.id {
            errors.add("departamento", DEPARTAMENTO_OUTSIDE_AREA);
        }
    }

    Ok(Placement {
        area_id: area.map(|area| area.id),
        departamento_id: departamento.map(|departamento| departamento.id),
        cargo_id: cargo.map(|cargo| cargo.id),
    })
}

/// Service for worker intake and self-service profile edits.
pub struct WorkerService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> WorkerService<S>
where
    S: CatalogRepository + WorkerRepository + IdentityRepository + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Accounts that can still receive a worker record, ordered by username.
    pub async fn unlinked_identities(&self) -> Result<Vec<Identity>, ServiceError> {
        let linked: BTreeSet<IdentityId> = self
            .store
            .workers()
            .await?
            .into_iter()
            .map(|worker| worker.identity_id)
            .collect();
        let mut identities: Vec<Identity> = self
            .store
            .identities()
            .await?
            .into_iter()
            .filter(|identity| !linked.contains(&identity.id))
            .collect();
        identities.sort_by(|left, right| left.username.cmp(&right.username));
        Ok(identities)
    }

    /// Administrative intake: the worker and both batches are stored as one unit.
    pub async fn intake(&self, form: IntakeForm) -> Result<Trabajador, ServiceError> {
        let mut errors = FieldErrors::new();

        let identity_id = match form.identity {
            None => {
                errors.add("identity", validation::REQUIRED);
                None
            }
            Some(id) => {
                let identity_id = IdentityId(id);
                let available = self.store.fetch_identity(identity_id).await?.is_some()
                    && self
                        .store
                        .worker_for_identity(identity_id)
                        .await?
                        .is_none();
                if !available {
                    errors.add("identity", INVALID_CHOICE);
                }
                Some(identity_id)
            }
        };

        let personal = form.personal.validate(&mut errors);
        let placement = resolve_placement(
            self.store.as_ref(),
            &mut errors,
            form.area,
            form.departamento,
            form.cargo,
        )
        .await?;
        let contactos = match batch::validate_contactos(&form.contactos, &BTreeSet::new()) {
            Ok(writes) => batch::inserts(writes),
            Err(batch_errors) => {
                errors.extend(batch_errors);
                Vec::new()
            }
        };
        let cargas = match batch::validate_cargas(&form.cargas, &BTreeSet::new()) {
            Ok(writes) => batch::inserts(writes),
            Err(batch_errors) => {
                errors.extend(batch_errors);
                Vec::new()
            }
        };

        let identity_id = match (identity_id, errors.is_empty()) {
            (Some(identity_id), true) => identity_id,
            _ => {
                warn!(fields = %errors, "worker intake rejected");
                return Err(ServiceError::Validation(errors));
            }
        };

        let worker = NewTrabajador {
            nombres: personal.nombres,
            apellidos: personal.apellidos,
            rut: personal.rut,
            sexo: personal.sexo,
            fecha_ingreso: personal.fecha_ingreso,
            area_id: placement.area_id,
            departamento_id: placement.departamento_id,
            cargo_id: placement.cargo_id,
            telefono: personal.telefono,
            direccion: personal.direccion,
        };
        let contact_count = contactos.len();
        let carga_count = cargas.len();
        let worker = self
            .store
            .insert_worker(identity_id, worker, contactos, cargas)
            .await
            .map_err(|err| {
                ServiceError::from_store(err, "Ya existe un trabajador para este usuario.")
            })?;

        info!(
            worker_id = worker.id.0,
            identity_id = identity_id.0,
            contactos = contact_count,
            cargas = carga_count,
            "worker registered"
        );
        Ok(worker)
    }

    /// The worker linked to an account, with its dependents.
    pub async fn profile(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<WorkerProfile>, ServiceError> {
        let Some(trabajador) = self.store.worker_for_identity(identity_id).await? else {
            return Ok(None);
        };
        let contactos = self.store.contactos(trabajador.id).await?;
        let cargas = self.store.cargas(trabajador.id).await?;
        Ok(Some(WorkerProfile {
            trabajador,
            contactos,
            cargas,
        }))
    }

    /// Apply a self-service edit. Personal fields and both batches commit together or not at all.
    pub async fn update_profile(
        &self,
        identity_id: IdentityId,
        form: ProfileForm,
    ) -> Result<WorkerProfile, ServiceError> {
        let Some(current) = self.profile(identity_id).await? else {
            return Err(ServiceError::NotFound(format!(
                "no worker linked to identity {}",
                identity_id.0
            )));
        };
        let worker_id = current.trabajador.id;

        let mut errors = FieldErrors::new();
        let personal = form.personal.validate(&mut errors);

        let owned_contactos = current.contactos.iter().map(|contacto| contacto.id).collect();
        let contactos = match batch::validate_contactos(&form.contactos, &owned_contactos) {
            Ok(writes) => writes,
            Err(batch_errors) => {
                errors.extend(batch_errors);
                Vec::new()
            }
        };
        let owned_cargas = current.cargas.iter().map(|carga| carga.id).collect();
        let cargas = match batch::validate_cargas(&form.cargas, &owned_cargas) {
            Ok(writes) => writes,
            Err(batch_errors) => {
                errors.extend(batch_errors);
                Vec::new()
            }
        };

        if !errors.is_empty() {
            warn!(worker_id = worker_id.0, fields = %errors, "profile update rejected");
            return Err(ServiceError::Validation(errors));
        }

        self.store
            .apply_profile_update(
                worker_id,
                ProfileUpdate {
                    personal,
                    contactos,
                    cargas,
                },
            )
            .await?;
        info!(worker_id = worker_id.0, "profile updated");

        self.profile(identity_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("no worker linked to identity {}", identity_id.0))
        })
    }
}

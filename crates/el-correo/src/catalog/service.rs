use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Area, AreaId, Cargo, CargoId, Departamento, DepartamentoId};
use crate::error::ServiceError;
use crate::store::{CatalogRepository, StoreError};
use crate::validation::text_or_number;

const NOMBRE_MAX_LEN: usize = 100;

/// Which catalog table an inline action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Area,
    Departamento,
    Cargo,
}

impl CatalogKind {
    fn label(self) -> &'static str {
        match self {
            Self::Area => "área",
            Self::Departamento => "departamento",
            Self::Cargo => "cargo",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Area => "Área",
            Self::Departamento => "Departamento",
            Self::Cargo => "Cargo",
        }
    }

    fn article(self) -> &'static str {
        match self {
            Self::Area => "El área",
            Self::Departamento => "El departamento",
            Self::Cargo => "El cargo",
        }
    }

    fn indefinite(self) -> &'static str {
        match self {
            Self::Area => "un área",
            Self::Departamento => "un departamento",
            Self::Cargo => "un cargo",
        }
    }

    fn feminine(self) -> bool {
        matches!(self, Self::Area)
    }

    fn plural(self) -> &'static str {
        match self {
            Self::Area => "áreas",
            Self::Departamento => "departamentos",
            Self::Cargo => "cargos",
        }
    }

    fn required_message(self) -> String {
        format!("El nombre del {} es obligatorio.", self.label())
    }

    fn created_message(self, nombre: &str) -> String {
        let verb = if self.feminine() { "creada" } else { "creado" };
        format!("{} \"{nombre}\" {verb} correctamente.", self.title())
    }

    fn existed_message(self, nombre: &str) -> String {
        format!("{} \"{nombre}\" ya existía.", self.article())
    }

    fn duplicate_message(self, nombre: &str) -> String {
        format!("Ya existe {} con el nombre \"{nombre}\".", self.indefinite())
    }

    fn updated_message(self) -> String {
        let verb = if self.feminine() {
            "actualizada"
        } else {
            "actualizado"
        };
        format!("{} {verb} correctamente.", self.title())
    }

    fn deleted_message(self) -> String {
        let verb = if self.feminine() {
            "eliminada"
        } else {
            "eliminado"
        };
        format!("{} {verb}.", self.title())
    }

    fn not_found_message(self) -> String {
        let verb = if self.feminine() {
            "encontrada"
        } else {
            "encontrado"
        };
        format!("{} no {verb}.", self.title())
    }

    fn forbidden_message(self) -> String {
        format!("No tiene permisos para gestionar {}.", self.plural())
    }
}

/// Inline status attached to a catalog page after a write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Success,
    Info,
    Error,
}

/// Message rendered next to the catalog form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogOutcome {
    pub form_status: FormStatus,
    pub form_message: String,
}

impl CatalogOutcome {
    fn success(message: String) -> Self {
        Self {
            form_status: FormStatus::Success,
            form_message: message,
        }
    }

    fn info(message: String) -> Self {
        Self {
            form_status: FormStatus::Info,
            form_message: message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            form_status: FormStatus::Error,
            form_message: message,
        }
    }
}

/// Raw inline form as submitted; every field is optional text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogForm {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub area: Option<String>,
}

/// Parsed inline action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogAction {
    Create {
        nombre: String,
        area: Option<i64>,
    },
    Update {
        id: Option<i64>,
        nombre: String,
        area: Option<i64>,
    },
    Delete {
        id: Option<i64>,
    },
    Unknown(String),
}

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

impl From<CatalogForm> for CatalogAction {
    fn from(form: CatalogForm) -> Self {
        let nombre = form.nombre.as_deref().unwrap_or_default().trim().to_string();
        let id = parse_id(form.id.as_deref());
        let area = parse_id(form.area.as_deref());
        let action = form
            .action
            .as_deref()
            .map(str::trim)
            .filter(|action| !action.is_empty())
            .unwrap_or("create");

        match action {
            "create" => Self::Create { nombre, area },
            "update" => Self::Update { id, nombre, area },
            "delete" => Self::Delete { id },
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Service wrapping catalog writes with the uniqueness and referential contract.
pub struct CatalogService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> CatalogService<S>
where
    S: CatalogRepository + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Strict create: fails with a field error when the name is taken.
    pub async fn create_area(&self, nombre: &str) -> Result<Area, ServiceError> {
        let nombre = validate_nombre(CatalogKind::Area, nombre)?;
        self.store
            .insert_area(&nombre)
            .await
            .map_err(|err| duplicate(err, CatalogKind::Area, &nombre))
    }

    pub async fn get_or_create_area(&self, nombre: &str) -> Result<(Area, bool), ServiceError> {
        let nombre = validate_nombre(CatalogKind::Area, nombre)?;
        Ok(self.store.get_or_create_area(&nombre).await?)
    }

    pub async fn create_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<Departamento, ServiceError> {
        let nombre = validate_nombre(CatalogKind::Departamento, nombre)?;
        self.store
            .insert_departamento(&nombre, area_id)
            .await
            .map_err(|err| duplicate(err, CatalogKind::Departamento, &nombre))
    }

    pub async fn get_or_create_departamento(
        &self,
        nombre: &str,
        area_id: AreaId,
    ) -> Result<(Departamento, bool), ServiceError> {
        let nombre = validate_nombre(CatalogKind::Departamento, nombre)?;
        Ok(self
            .store
            .get_or_create_departamento(&nombre, area_id)
            .await?)
    }

    pub async fn create_cargo(&self, nombre: &str) -> Result<Cargo, ServiceError> {
        let nombre = validate_nombre(CatalogKind::Cargo, nombre)?;
        self.store
            .insert_cargo(&nombre)
            .await
            .map_err(|err| duplicate(err, CatalogKind::Cargo, &nombre))
    }

    pub async fn get_or_create_cargo(&self, nombre: &str) -> Result<(Cargo, bool), ServiceError> {
        let nombre = validate_nombre(CatalogKind::Cargo, nombre)?;
        Ok(self.store.get_or_create_cargo(&nombre).await?)
    }

    /// Outcome shown to a user without the catalog capability, whatever they submitted.
    pub fn refuse(&self, kind: CatalogKind) -> CatalogOutcome {
        warn!(catalog = kind.label(), "catalog write rejected: missing capability");
        CatalogOutcome::error(kind.forbidden_message())
    }

    /// Run one inline catalog action. Expected failures come back as an `Error` outcome; only
    /// store unavailability escapes as `Err`.
    pub async fn apply(
        &self,
        kind: CatalogKind,
        action: CatalogAction,
        allowed: bool,
    ) -> Result<CatalogOutcome, ServiceError> {
        if !allowed {
            return Ok(self.refuse(kind));
        }

        let outcome = match action {
            CatalogAction::Create { nombre, area } => {
                self.create_inline(kind, &nombre, area).await?
            }
            CatalogAction::Update { id, nombre, area } => {
                self.update_inline(kind, id, &nombre, area).await?
            }
            CatalogAction::Delete { id } => self.delete_inline(kind, id).await?,
            CatalogAction::Unknown(action) => {
                warn!(catalog = kind.label(), %action, "unknown catalog action");
                CatalogOutcome::error("Acción no reconocida.".to_string())
            }
        };

        if outcome.form_status == FormStatus::Error {
            warn!(catalog = kind.label(), message = %outcome.form_message, "catalog write rejected");
        } else {
            info!(catalog = kind.label(), message = %outcome.form_message, "catalog write applied");
        }
        Ok(outcome)
    }

    async fn create_inline(
        &self,
        kind: CatalogKind,
        nombre: &str,
        area: Option<i64>,
    ) -> Result<CatalogOutcome, ServiceError> {
        if let Some(message) = nombre_problem(kind, nombre) {
            return Ok(CatalogOutcome::error(message));
        }

        let created = match kind {
            CatalogKind::Area => self
                .store
                .get_or_create_area(nombre)
                .await
                .map(|(_, created)| created),
            CatalogKind::Cargo => self
                .store
                .get_or_create_cargo(nombre)
                .await
                .map(|(_, created)| created),
            CatalogKind::Departamento => {
                let Some(area_id) = self.existing_area(area).await? else {
                    return Ok(CatalogOutcome::error(
                        "Debe seleccionar un área válida.".to_string(),
                    ));
                };
                self.store
                    .get_or_create_departamento(nombre, area_id)
                    .await
                    .map(|(_, created)| created)
            }
        };

        match created {
            Ok(true) => Ok(CatalogOutcome::success(kind.created_message(nombre))),
            Ok(false) => Ok(CatalogOutcome::info(kind.existed_message(nombre))),
            Err(err) => self.settle(kind, nombre, err),
        }
    }

    async fn update_inline(
        &self,
        kind: CatalogKind,
        id: Option<i64>,
        nombre: &str,
        area: Option<i64>,
    ) -> Result<CatalogOutcome, ServiceError> {
        let Some(id) = id else {
            return Ok(CatalogOutcome::error(kind.not_found_message()));
        };
        if !self.exists(kind, id).await? {
            return Ok(CatalogOutcome::error(kind.not_found_message()));
        }
        if let Some(message) = nombre_problem(kind, nombre) {
            return Ok(CatalogOutcome::error(message));
        }

        let result = match kind {
            CatalogKind::Area => self
                .store
                .rename_area(AreaId(id), nombre)
                .await
                .map(|_| ()),
            CatalogKind::Cargo => self
                .store
                .rename_cargo(CargoId(id), nombre)
                .await
                .map(|_| ()),
            CatalogKind::Departamento => {
                let current = self.store.fetch_departamento(DepartamentoId(id)).await?;
                let area_id = match (area, current) {
                    (Some(_), _) => match self.existing_area(area).await? {
                        Some(area_id) => area_id,
                        None => {
                            return Ok(CatalogOutcome::error(
                                "Debe seleccionar un área válida.".to_string(),
                            ))
                        }
                    },
                    (None, Some(current)) => current.area_id,
                    (None, None) => return Ok(CatalogOutcome::error(kind.not_found_message())),
                };
                self.store
                    .update_departamento(DepartamentoId(id), nombre, area_id)
                    .await
                    .map(|_| ())
            }
        };

        match result {
            Ok(()) => Ok(CatalogOutcome::success(kind.updated_message())),
            Err(err) => self.settle(kind, nombre, err),
        }
    }

    async fn delete_inline(
        &self,
        kind: CatalogKind,
        id: Option<i64>,
    ) -> Result<CatalogOutcome, ServiceError> {
        let Some(id) = id else {
            return Ok(CatalogOutcome::error(kind.not_found_message()));
        };
        let result = match kind {
            CatalogKind::Area => self.store.delete_area(AreaId(id)).await,
            CatalogKind::Departamento => {
                self.store.delete_departamento(DepartamentoId(id)).await
            }
            CatalogKind::Cargo => self.store.delete_cargo(CargoId(id)).await,
        };
        match result {
            Ok(()) => Ok(CatalogOutcome::success(kind.deleted_message())),
            Err(err) => self.settle(kind, "", err),
        }
    }

    async fn exists(&self, kind: CatalogKind, id: i64) -> Result<bool, StoreError> {
        Ok(match kind {
            CatalogKind::Area => self.store.fetch_area(AreaId(id)).await?.is_some(),
            CatalogKind::Departamento => self
                .store
                .fetch_departamento(DepartamentoId(id))
                .await?
                .is_some(),
            CatalogKind::Cargo => self.store.fetch_cargo(CargoId(id)).await?.is_some(),
        })
    }

    async fn existing_area(&self, area: Option<i64>) -> Result<Option<AreaId>, StoreError> {
        match area {
            Some(id) => Ok(self.store.fetch_area(AreaId(id)).await?.map(|area| area.id)),
            None => Ok(None),
        }
    }

    fn settle(
        &self,
        kind: CatalogKind,
        nombre: &str,
        err: StoreError,
    ) -> Result<CatalogOutcome, ServiceError> {
        match err {
            StoreError::DuplicateKey { .. } => {
                Ok(CatalogOutcome::error(kind.duplicate_message(nombre)))
            }
            StoreError::NotFound { .. } => Ok(CatalogOutcome::error(kind.not_found_message())),
            StoreError::ForeignKey { .. } => Ok(CatalogOutcome::error(
                "Debe seleccionar un área válida.".to_string(),
            )),
            other => Err(ServiceError::Store(other)),
        }
    }
}

fn nombre_problem(kind: CatalogKind, nombre: &str) -> Option<String> {
    if nombre.is_empty() {
        return Some(kind.required_message());
    }
    if nombre.chars().count() > NOMBRE_MAX_LEN {
        return Some(format!(
            "El nombre no puede superar {NOMBRE_MAX_LEN} caracteres."
        ));
    }
    None
}

fn validate_nombre(kind: CatalogKind, nombre: &str) -> Result<String, ServiceError> {
    let nombre = nombre.trim();
    match nombre_problem(kind, nombre) {
        Some(message) => Err(ServiceError::field("nombre", message)),
        None => Ok(nombre.to_string()),
    }
}

fn duplicate(err: StoreError, kind: CatalogKind, nombre: &str) -> ServiceError {
    ServiceError::from_store(err, &kind.duplicate_message(nombre))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> CatalogService<MemoryStore> {
        CatalogService::new(Arc::new(MemoryStore::new()))
    }

    fn form(action: &str, nombre: &str, id: Option<&str>) -> CatalogAction {
        CatalogAction::from(CatalogForm {
            action: Some(action.to_string()),
            nombre: Some(nombre.to_string()),
            id: id.map(str::to_string),
            area: None,
        })
    }

    #[test]
    fn blank_action_defaults_to_create() {
        let action = CatalogAction::from(CatalogForm {
            nombre: Some("  Analista ".to_string()),
            ..CatalogForm::default()
        });
        assert_eq!(
            action,
            CatalogAction::Create {
                nombre: "Analista".to_string(),
                area: None
            }
        );
    }

    #[test]
    fn ids_may_arrive_as_numbers_or_text() {
        let numeric: CatalogForm =
            serde_json::from_str(r#"{"action":"delete","id":7}"#).expect("numeric id");
        let textual: CatalogForm =
            serde_json::from_str(r#"{"action":"delete","id":"7"}"#).expect("text id");
        assert_eq!(CatalogAction::from(numeric), CatalogAction::Delete { id: Some(7) });
        assert_eq!(CatalogAction::from(textual), CatalogAction::Delete { id: Some(7) });
    }

    #[tokio::test]
    async fn inline_create_reports_existing_rows_as_info() {
        let service = service();
        let first = service
            .apply(CatalogKind::Cargo, form("create", "Analista", None), true)
            .await
            .expect("create runs");
        assert_eq!(first.form_status, FormStatus::Success);
        assert_eq!(first.form_message, "Cargo \"Analista\" creado correctamente.");

        let second = service
            .apply(CatalogKind::Cargo, form("create", "Analista", None), true)
            .await
            .expect("create runs");
        assert_eq!(second.form_status, FormStatus::Info);
        assert_eq!(second.form_message, "El cargo \"Analista\" ya existía.");
    }

    #[tokio::test]
    async fn inline_update_rejects_duplicate_names() {
        let service = service();
        service.create_area("Finanzas").await.expect("area");
        let ti = service.create_area("TI").await.expect("area");

        let outcome = service
            .apply(
                CatalogKind::Area,
                form("update", "Finanzas", Some(&ti.id.0.to_string())),
                true,
            )
            .await
            .expect("update runs");
        assert_eq!(outcome.form_status, FormStatus::Error);
        assert_eq!(
            outcome.form_message,
            "Ya existe un área con el nombre \"Finanzas\"."
        );
    }

    #[tokio::test]
    async fn missing_targets_surface_as_messages() {
        let service = service();
        let outcome = service
            .apply(CatalogKind::Area, form("delete", "", Some("77")), true)
            .await
            .expect("delete runs");
        assert_eq!(outcome.form_status, FormStatus::Error);
        assert_eq!(outcome.form_message, "Área no encontrada.");

        let outcome = service
            .apply(CatalogKind::Cargo, form("update", "Jefe", Some("abc")), true)
            .await
            .expect("update runs");
        assert_eq!(outcome.form_message, "Cargo no encontrado.");
    }

    #[tokio::test]
    async fn writes_without_capability_are_refused_inline() {
        let service = service();
        let outcome = service
            .apply(CatalogKind::Cargo, form("create", "Operario", None), false)
            .await
            .expect("apply runs");
        assert_eq!(outcome, service.refuse(CatalogKind::Cargo));
        assert_eq!(outcome.form_status, FormStatus::Error);
        assert_eq!(
            outcome.form_message,
            "No tiene permisos para gestionar cargos."
        );
        assert!(service
            .store
            .cargo_rows()
            .await
            .expect("rows")
            .is_empty());
    }

    #[tokio::test]
    async fn departamento_create_requires_existing_area() {
        let service = service();
        let outcome = service
            .apply(
                CatalogKind::Departamento,
                CatalogAction::Create {
                    nombre: "Tesorería".to_string(),
                    area: Some(5),
                },
                true,
            )
            .await
            .expect("apply runs");
        assert_eq!(outcome.form_message, "Debe seleccionar un área válida.");
    }

    #[tokio::test]
    async fn strict_create_reports_duplicate_as_field_error() {
        let service = service();
        service.create_cargo("Analista").await.expect("first create");
        match service.create_cargo("Analista").await {
            Err(ServiceError::Validation(errors)) => assert!(errors.contains("nombre")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{AreaId, CargoId, DepartamentoId};
use crate::identity::IdentityId;

/// Identifier wrapper for worker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub i64);

/// Identifier wrapper for emergency contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactoId(pub i64);

/// Identifier wrapper for family dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CargaId(pub i64);

/// Recorded sex of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sexo {
    #[serde(rename = "M")]
    Masculino,
    #[serde(rename = "F")]
    Femenino,
    #[serde(rename = "O")]
    Otro,
}

impl Sexo {
    pub const ALL: [Sexo; 3] = [Sexo::Masculino, Sexo::Femenino, Sexo::Otro];

    /// Parse the stored code (`M`, `F`, `O`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" => Some(Self::Masculino),
            "F" => Some(Self::Femenino),
            "O" => Some(Self::Otro),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Masculino => "M",
            Self::Femenino => "F",
            Self::Otro => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Masculino => "Masculino",
            Self::Femenino => "Femenino",
            Self::Otro => "Otro",
        }
    }
}

/// Worker record, one-to-one with an identity. Default listing order is (`apellidos`, `nombres`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trabajador {
    pub id: WorkerId,
    pub identity_id: IdentityId,
    pub nombres: String,
    pub apellidos: String,
    pub rut: Option<String>,
    pub sexo: Sexo,
    pub fecha_ingreso: Option<NaiveDate>,
    pub area_id: Option<AreaId>,
    pub departamento_id: Option<DepartamentoId>,
    pub cargo_id: Option<CargoId>,
    pub telefono: String,
    pub direccion: String,
}

impl Trabajador {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.nombres, self.apellidos)
    }
}

/// Field values for a worker row that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrabajador {
    pub nombres: String,
    pub apellidos: String,
    pub rut: Option<String>,
    pub sexo: Sexo,
    pub fecha_ingreso: Option<NaiveDate>,
    pub area_id: Option<AreaId>,
    pub departamento_id: Option<DepartamentoId>,
    pub cargo_id: Option<CargoId>,
    pub telefono: String,
    pub direccion: String,
}

/// Worker joined with the names of its placement and account, as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerRow {
    #[serde(flatten)]
    pub trabajador: Trabajador,
    pub username: String,
    pub area_nombre: Option<String>,
    pub departamento_nombre: Option<String>,
    pub cargo_nombre: Option<String>,
}

/// Emergency contact owned by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactoEmergencia {
    pub id: ContactoId,
    pub trabajador_id: WorkerId,
    pub nombre: String,
    pub parentesco: String,
    pub telefono: String,
}

/// Validated contact values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactoFields {
    pub nombre: String,
    pub parentesco: String,
    pub telefono: String,
}

/// Family dependent owned by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargaFamiliar {
    pub id: CargaId,
    pub trabajador_id: WorkerId,
    pub nombre: String,
    pub parentesco: String,
    pub fecha_nacimiento: Option<NaiveDate>,
}

/// Validated dependent values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargaFields {
    pub nombre: String,
    pub parentesco: String,
    pub fecha_nacimiento: Option<NaiveDate>,
}

/// Personal fields a worker may edit on their own profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalFields {
    pub nombres: String,
    pub apellidos: String,
    pub sexo: Sexo,
    pub rut: Option<String>,
    pub fecha_ingreso: Option<NaiveDate>,
    pub telefono: String,
    pub direccion: String,
}

/// One validated write against a dependent collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowWrite<Id, Fields> {
    Insert(Fields),
    Update(Id, Fields),
    Delete(Id),
}

/// Validated profile edit applied as one atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub personal: PersonalFields,
    pub contactos: Vec<RowWrite<ContactoId, ContactoFields>>,
    pub cargas: Vec<RowWrite<CargaId, CargaFields>>,
}

/// Worker together with the dependent collections it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerProfile {
    pub trabajador: Trabajador,
    pub contactos: Vec<ContactoEmergencia>,
    pub cargas: Vec<CargaFamiliar>,
}

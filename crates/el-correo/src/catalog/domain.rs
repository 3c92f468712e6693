use serde::{Deserialize, Serialize};

/// Identifier wrapper for areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaId(pub i64);

/// Identifier wrapper for departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepartamentoId(pub i64);

/// Identifier wrapper for job titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CargoId(pub i64);

/// Top-level organizational unit. `nombre` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub nombre: String,
}

/// Sub-unit of an area. The pair (`nombre`, `area_id`) is unique; deleting the area deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departamento {
    pub id: DepartamentoId,
    pub nombre: String,
    pub area_id: AreaId,
}

/// Job title, independent of organizational placement. `nombre` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    pub id: CargoId,
    pub nombre: String,
}

/// Area annotated with live department and worker counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaRow {
    #[serde(flatten)]
    pub area: Area,
    pub num_departamentos: usize,
    pub num_trabajadores: usize,
}

/// Department joined with its area name and annotated with its worker count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartamentoRow {
    #[serde(flatten)]
    pub departamento: Departamento,
    pub area_nombre: String,
    pub num_trabajadores: usize,
}

impl DepartamentoRow {
    /// Display label used in selects, e.g. `Tesorería (Finanzas)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.departamento.nombre, self.area_nombre)
    }
}

/// Job title annotated with the number of workers holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CargoRow {
    #[serde(flatten)]
    pub cargo: Cargo,
    pub num_trabajadores: usize,
}

/// Row totals for the three catalog tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub areas: usize,
    pub departamentos: usize,
    pub cargos: usize,
}

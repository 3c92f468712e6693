//! Organizational catalog: areas, their departments, and job titles.

mod domain;
pub mod service;

pub use domain::{
    Area, AreaId, AreaRow, Cargo, CargoId, CargoRow, CatalogCounts, Departamento, DepartamentoId,
    DepartamentoRow,
};
pub use service::{
    CatalogAction, CatalogForm, CatalogKind, CatalogOutcome, CatalogService, FormStatus,
};

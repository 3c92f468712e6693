//! Filtered, ordered, paginated views over the worker registry and the catalog.
//!
//! The store hands over annotated snapshots; everything from here on is pure.

mod catalog;
mod paginate;
mod params;
mod workers;

use std::sync::Arc;

use serde::Serialize;

pub use catalog::{list_areas, list_cargos, list_departamentos, CatalogListing};
pub use paginate::{paginate, Page, PAGE_SIZE};
pub use params::{
    parse_page, AreaOrder, CargoOrder, CatalogFilter, CatalogQuery, DepartamentoOrder, SortKey,
    WorkerFilter, WorkerOrder, WorkerQuery,
};
pub use workers::{list_workers, ListedWorker, WorkerListing};

use crate::catalog::{AreaRow, CargoRow, DepartamentoRow};
use crate::error::ServiceError;
use crate::identity::Identity;
use crate::store::Store;
use crate::workers::{WorkerId, WorkerRow};

/// Totals shown on the dashboard and served by `/api/dashboard`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total_usuarios: usize,
    pub total_trabajadores: usize,
    pub total_departamentos: usize,
    pub total_cargos: usize,
    pub total_areas: usize,
}

/// `{id, nombre}` pair served by `/api/trabajadores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub id: WorkerId,
    pub nombre: String,
}

pub struct ListingService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ListingService<S>
where
    S: Store + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn workers(
        &self,
        query: &WorkerQuery,
    ) -> Result<WorkerListing<WorkerRow>, ServiceError> {
        Ok(list_workers(self.store.worker_rows().await?, query))
    }

    pub async fn areas(
        &self,
        query: &CatalogQuery,
    ) -> Result<CatalogListing<AreaRow, AreaOrder>, ServiceError> {
        Ok(list_areas(self.store.area_rows().await?, query))
    }

    pub async fn departamentos(
        &self,
        query: &CatalogQuery,
    ) -> Result<CatalogListing<DepartamentoRow, DepartamentoOrder>, ServiceError> {
        Ok(list_departamentos(
            self.store.departamento_rows().await?,
            query,
        ))
    }

    pub async fn cargos(
        &self,
        query: &CatalogQuery,
    ) -> Result<CatalogListing<CargoRow, CargoOrder>, ServiceError> {
        Ok(list_cargos(self.store.cargo_rows().await?, query))
    }

    pub async fn dashboard(&self) -> Result<DashboardCounts, ServiceError> {
        let catalog = self.store.catalog_counts().await?;
        Ok(DashboardCounts {
            total_usuarios: self.store.count_identities().await?,
            total_trabajadores: self.store.count_workers().await?,
            total_departamentos: catalog.departamentos,
            total_cargos: catalog.cargos,
            total_areas: catalog.areas,
        })
    }

    /// Every account, by id.
    pub async fn identities(&self) -> Result<Vec<Identity>, ServiceError> {
        Ok(self.store.identities().await?)
    }

    /// Every worker in the default (surnames, given names) order.
    pub async fn worker_summaries(&self) -> Result<Vec<WorkerSummary>, ServiceError> {
        let mut rows = self.store.worker_rows().await?;
        workers::sort_workers(&mut rows, WorkerOrder::NameAsc);
        Ok(rows
            .into_iter()
            .map(|row| WorkerSummary {
                id: row.trabajador.id,
                nombre: row.trabajador.display_name(),
            })
            .collect())
    }
}

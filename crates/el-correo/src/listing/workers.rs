use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use super::paginate::{paginate, Page};
use super::params::{icontains, parse_page, WorkerFilter, WorkerOrder, WorkerQuery};
use crate::catalog::{AreaId, CargoId, DepartamentoId};
use crate::workers::{Sexo, WorkerRow};

/// Columns the worker listing filters and sorts on.
///
/// Whether a national-id column exists is part of the row type, so the `rut` filter is either
/// compiled in or ignored for every request alike.
pub trait ListedWorker {
    const HAS_NATIONAL_ID: bool;

    fn row_id(&self) -> i64;
    fn nombres(&self) -> &str;
    fn apellidos(&self) -> &str;
    fn national_id(&self) -> Option<&str>;
    fn sexo(&self) -> Sexo;
    fn fecha_ingreso(&self) -> Option<NaiveDate>;
    fn area_id(&self) -> Option<AreaId>;
    fn departamento_id(&self) -> Option<DepartamentoId>;
    fn cargo_id(&self) -> Option<CargoId>;
}

impl ListedWorker for WorkerRow {
    const HAS_NATIONAL_ID: bool = true;

    fn row_id(&self) -> i64 {
        self.trabajador.id.0
    }

    fn nombres(&self) -> &str {
        &self.trabajador.nombres
    }

    fn apellidos(&self) -> &str {
        &self.trabajador.apellidos
    }

    fn national_id(&self) -> Option<&str> {
        self.trabajador.rut.as_deref()
    }

    fn sexo(&self) -> Sexo {
        self.trabajador.sexo
    }

    fn fecha_ingreso(&self) -> Option<NaiveDate> {
        self.trabajador.fecha_ingreso
    }

    fn area_id(&self) -> Option<AreaId> {
        self.trabajador.area_id
    }

    fn departamento_id(&self) -> Option<DepartamentoId> {
        self.trabajador.departamento_id
    }

    fn cargo_id(&self) -> Option<CargoId> {
        self.trabajador.cargo_id
    }
}

/// A page of workers plus the counts shown around it.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerListing<R> {
    pub page: Page<R>,
    /// Rows matching the filters, before pagination.
    pub filtered_count: usize,
    /// Every worker, ignoring filters.
    pub total_count: usize,
    pub filters: WorkerFilter,
    pub has_rut: bool,
}

fn passes<R: ListedWorker>(
    row: &R,
    filter: &WorkerFilter,
    q: Option<&str>,
    rut: Option<&str>,
) -> bool {
    if let Some(q) = q {
        if !icontains(row.nombres(), q) && !icontains(row.apellidos(), q) {
            return false;
        }
    }
    if R::HAS_NATIONAL_ID {
        if let Some(rut) = rut {
            if !row.national_id().is_some_and(|value| icontains(value, rut)) {
                return false;
            }
        }
    }
    if filter.area.is_some() && row.area_id() != filter.area {
        return false;
    }
    if filter.cargo.is_some() && row.cargo_id() != filter.cargo {
        return false;
    }
    if filter.depto.is_some() && row.departamento_id() != filter.depto {
        return false;
    }
    if filter.sexo.is_some_and(|sexo| row.sexo() != sexo) {
        return false;
    }
    true
}

/// (surnames, given names) case-insensitively, then byte order so the result is total.
fn by_name<R: ListedWorker>(left: &R, right: &R) -> Ordering {
    left.apellidos()
        .to_lowercase()
        .cmp(&right.apellidos().to_lowercase())
        .then_with(|| left.nombres().to_lowercase().cmp(&right.nombres().to_lowercase()))
        .then_with(|| left.apellidos().cmp(right.apellidos()))
        .then_with(|| left.nombres().cmp(right.nombres()))
}

pub(crate) fn sort_workers<R: ListedWorker>(rows: &mut [R], order: WorkerOrder) {
    match order {
        WorkerOrder::NameAsc => rows.sort_by(|left, right| {
            by_name(left, right).then(left.row_id().cmp(&right.row_id()))
        }),
        WorkerOrder::NameDesc => rows.sort_by(|left, right| {
            by_name(right, left).then(left.row_id().cmp(&right.row_id()))
        }),
        // Missing hire dates sort as the smallest value.
        WorkerOrder::DateAsc => rows.sort_by(|left, right| {
            left.fecha_ingreso()
                .cmp(&right.fecha_ingreso())
                .then_with(|| by_name(left, right))
                .then(left.row_id().cmp(&right.row_id()))
        }),
        WorkerOrder::DateDesc => rows.sort_by(|left, right| {
            right
                .fecha_ingreso()
                .cmp(&left.fecha_ingreso())
                .then_with(|| by_name(left, right))
                .then(left.row_id().cmp(&right.row_id()))
        }),
    }
}

/// Filter, order, and paginate a worker snapshot.
pub fn list_workers<R: ListedWorker>(rows: Vec<R>, query: &WorkerQuery) -> WorkerListing<R> {
    let filter = WorkerFilter::resolve(query);
    let total_count = rows.len();

    let q = filter.q.as_deref().map(str::to_lowercase);
    let rut = filter.rut.as_deref().map(str::to_lowercase);
    let mut rows: Vec<R> = rows
        .into_iter()
        .filter(|row| passes(row, &filter, q.as_deref(), rut.as_deref()))
        .collect();
    sort_workers(&mut rows, filter.order);

    let filtered_count = rows.len();
    let page = paginate(rows, parse_page(query.page.as_deref()));
    tracing::debug!(
        ?filter,
        filtered_count,
        total_count,
        page = page.number,
        "worker listing resolved"
    );

    WorkerListing {
        page,
        filtered_count,
        total_count,
        filters: filter,
        has_rut: R::HAS_NATIONAL_ID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Legacy {
        id: i64,
        nombres: &'static str,
        apellidos: &'static str,
    }

    impl ListedWorker for Legacy {
        const HAS_NATIONAL_ID: bool = false;

        fn row_id(&self) -> i64 {
            self.id
        }
        fn nombres(&self) -> &str {
            self.nombres
        }
        fn apellidos(&self) -> &str {
            self.apellidos
        }
        fn national_id(&self) -> Option<&str> {
            None
        }
        fn sexo(&self) -> Sexo {
            Sexo::Otro
        }
        fn fecha_ingreso(&self) -> Option<NaiveDate> {
            None
        }
        fn area_id(&self) -> Option<AreaId> {
            None
        }
        fn departamento_id(&self) -> Option<DepartamentoId> {
            None
        }
        fn cargo_id(&self) -> Option<CargoId> {
            None
        }
    }

    #[test]
    fn rut_filter_is_ignored_without_a_national_id_column() {
        let rows = vec![
            Legacy {
                id: 1,
                nombres: "Ana",
                apellidos: "Rojas",
            },
            Legacy {
                id: 2,
                nombres: "Luis",
                apellidos: "Soto",
            },
        ];
        let listing = list_workers(
            rows,
            &WorkerQuery {
                rut: Some("11.111".to_string()),
                ..WorkerQuery::default()
            },
        );
        assert!(!listing.has_rut);
        assert_eq!(listing.filtered_count, 2);
    }

    #[test]
    fn name_order_ignores_case() {
        let rows = vec![
            Legacy {
                id: 1,
                nombres: "Ana",
                apellidos: "soto",
            },
            Legacy {
                id: 2,
                nombres: "Luis",
                apellidos: "Rojas",
            },
            Legacy {
                id: 3,
                nombres: "beatriz",
                apellidos: "Rojas",
            },
        ];
        let listing = list_workers(rows, &WorkerQuery::default());
        let ids: Vec<i64> = listing.page.items.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let rows = listing.page.items;
        let listing = list_workers(
            rows,
            &WorkerQuery {
                order: Some("name_desc".to_string()),
                ..WorkerQuery::default()
            },
        );
        let ids: Vec<i64> = listing.page.items.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}

use std::cmp::Ordering;

use serde::Serialize;

use super::paginate::{paginate, Page};
use super::params::{
    icontains, parse_page, AreaOrder, CargoOrder, CatalogFilter, CatalogQuery, DepartamentoOrder,
    SortKey,
};
use crate::catalog::{AreaRow, CargoRow, DepartamentoRow};

/// A page of catalog rows plus the counts shown around it.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing<T, O> {
    pub page: Page<T>,
    pub filtered_count: usize,
    pub total_count: usize,
    pub filters: CatalogFilter<O>,
}

fn by_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

fn list<T, O>(
    rows: Vec<T>,
    query: &CatalogQuery,
    keep: impl Fn(&T, &CatalogFilter<O>, Option<&str>) -> bool,
    compare: impl Fn(&T, &T, O) -> Ordering,
) -> CatalogListing<T, O>
where
    O: SortKey + std::fmt::Debug,
{
    let filter = CatalogFilter::<O>::resolve(query);
    let total_count = rows.len();
    let q = filter.q.as_deref().map(str::to_lowercase);

    let mut rows: Vec<T> = rows
        .into_iter()
        .filter(|row| keep(row, &filter, q.as_deref()))
        .collect();
    rows.sort_by(|left, right| compare(left, right, filter.order));

    let filtered_count = rows.len();
    let page = paginate(rows, parse_page(query.page.as_deref()));
    tracing::debug!(
        order = ?filter.order,
        filtered_count,
        total_count,
        page = page.number,
        "catalog listing resolved"
    );

    CatalogListing {
        page,
        filtered_count,
        total_count,
        filters: filter,
    }
}

fn name_matches(nombre: &str, q: Option<&str>) -> bool {
    q.map_or(true, |q| icontains(nombre, q))
}

/// Ordering on a count; callers chain the name tiebreak.
fn by_count(left: usize, right: usize, descending: bool) -> Ordering {
    if descending {
        right.cmp(&left)
    } else {
        left.cmp(&right)
    }
}

pub fn list_areas(
    rows: Vec<AreaRow>,
    query: &CatalogQuery,
) -> CatalogListing<AreaRow, AreaOrder> {
    list::<_, AreaOrder>(
        rows,
        query,
        |row, _, q| name_matches(&row.area.nombre, q),
        |left, right, order| {
            let names = by_text(&left.area.nombre, &right.area.nombre);
            let primary = match order {
                AreaOrder::NameAsc => names,
                AreaOrder::NameDesc => names.reverse(),
                AreaOrder::DeptAsc => {
                    by_count(left.num_departamentos, right.num_departamentos, false)
                }
                AreaOrder::DeptDesc => {
                    by_count(left.num_departamentos, right.num_departamentos, true)
                }
                AreaOrder::EmpAsc | AreaOrder::CountAsc => {
                    by_count(left.num_trabajadores, right.num_trabajadores, false)
                }
                AreaOrder::EmpDesc | AreaOrder::CountDesc => {
                    by_count(left.num_trabajadores, right.num_trabajadores, true)
                }
            };
            primary.then(names).then(left.area.id.cmp(&right.area.id))
        },
    )
}

pub fn list_departamentos(
    rows: Vec<DepartamentoRow>,
    query: &CatalogQuery,
) -> CatalogListing<DepartamentoRow, DepartamentoOrder> {
    list::<_, DepartamentoOrder>(
        rows,
        query,
        |row, filter, q| {
            name_matches(&row.departamento.nombre, q)
                && filter
                    .area
                    .map_or(true, |area| row.departamento.area_id == area)
        },
        |left, right, order| {
            let names = by_text(&left.departamento.nombre, &right.departamento.nombre);
            let areas = by_text(&left.area_nombre, &right.area_nombre);
            let primary = match order {
                DepartamentoOrder::NameAsc => names,
                DepartamentoOrder::NameDesc => names.reverse(),
                DepartamentoOrder::AreaAsc => areas,
                DepartamentoOrder::AreaDesc => areas.reverse(),
                DepartamentoOrder::CountAsc => {
                    by_count(left.num_trabajadores, right.num_trabajadores, false)
                }
                DepartamentoOrder::CountDesc => {
                    by_count(left.num_trabajadores, right.num_trabajadores, true)
                }
            };
            primary
                .then(names)
                .then(left.departamento.id.cmp(&right.departamento.id))
        },
    )
}

pub fn list_cargos(
    rows: Vec<CargoRow>,
    query: &CatalogQuery,
) -> CatalogListing<CargoRow, CargoOrder> {
    list::<_, CargoOrder>(
        rows,
        query,
        |row, _, q| name_matches(&row.cargo.nombre, q),
        |left, right, order| {
            let names = by_text(&left.cargo.nombre, &right.cargo.nombre);
            let primary = match order {
                CargoOrder::NameAsc => names,
                CargoOrder::NameDesc => names.reverse(),
                CargoOrder::CountAsc => {
                    by_count(left.num_trabajadores, right.num_trabajadores, false)
                }
                CargoOrder::CountDesc => {
                    by_count(left.num_trabajadores, right.num_trabajadores, true)
                }
            };
            primary.then(names).then(left.cargo.id.cmp(&right.cargo.id))
        },
    )
}

//! Raw query-string parameters and their forgiving resolution.
//!
//! Nothing here fails: malformed values are dropped or replaced by their default.

use serde::{Deserialize, Serialize};

use crate::catalog::{AreaId, CargoId, DepartamentoId};
use crate::workers::Sexo;

/// Worker listing parameters exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerQuery {
    pub q: Option<String>,
    pub rut: Option<String>,
    pub area: Option<String>,
    pub cargo: Option<String>,
    pub depto: Option<String>,
    pub sexo: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

/// Catalog listing parameters exactly as received. `area` only applies to departamentos.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub area: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

/// Trimmed text; blank means no filter.
pub(crate) fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

/// Requested page number: unparsable or below one becomes one. A number too large to
/// represent saturates, so it still lands on the last page.
pub fn parse_page(raw: Option<&str>) -> usize {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return 1;
    };
    if value.bytes().all(|byte| byte.is_ascii_digit()) {
        return match value.parse::<usize>() {
            Ok(page) => page.max(1),
            Err(_) => usize::MAX,
        };
    }
    value
        .parse::<i64>()
        .ok()
        .filter(|page| *page >= 1)
        .and_then(|page| usize::try_from(page).ok())
        .unwrap_or(1)
}

/// Case-insensitive substring test.
pub(crate) fn icontains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Worker filters after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerFilter {
    pub q: Option<String>,
    pub rut: Option<String>,
    pub area: Option<AreaId>,
    pub cargo: Option<CargoId>,
    pub depto: Option<DepartamentoId>,
    pub sexo: Option<Sexo>,
    pub order: WorkerOrder,
}

impl WorkerFilter {
    pub fn resolve(query: &WorkerQuery) -> Self {
        Self {
            q: text(query.q.as_deref()),
            rut: text(query.rut.as_deref()),
            area: id(query.area.as_deref()).map(AreaId),
            cargo: id(query.cargo.as_deref()).map(CargoId),
            depto: id(query.depto.as_deref()).map(DepartamentoId),
            sexo: query.sexo.as_deref().and_then(Sexo::from_code),
            order: WorkerOrder::parse(query.order.as_deref()),
        }
    }
}

/// Catalog filters after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogFilter<O> {
    pub q: Option<String>,
    pub area: Option<AreaId>,
    pub order: O,
}

impl<O: SortKey> CatalogFilter<O> {
    pub fn resolve(query: &CatalogQuery) -> Self {
        Self {
            q: text(query.q.as_deref()),
            area: id(query.area.as_deref()).map(AreaId),
            order: O::parse(query.order.as_deref()),
        }
    }
}

/// A fixed set of sort keys; anything unrecognised resolves to the default.
pub trait SortKey: Copy + Default + 'static {
    const KEYS: &'static [(&'static str, Self)];

    fn parse(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .and_then(|raw| Self::KEYS.iter().find(|(key, _)| *key == raw))
            .map(|(_, order)| *order)
            .unwrap_or_default()
    }
}

macro_rules! sort_keys {
    ($name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
        pub enum $name {
            #[default]
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl SortKey for $name {
            const KEYS: &'static [(&'static str, Self)] = &[$(($key, Self::$variant)),+];
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }
        }
    };
}

sort_keys!(WorkerOrder {
    NameAsc => "name_asc",
    NameDesc => "name_desc",
    DateAsc => "date_asc",
    DateDesc => "date_desc",
});

sort_keys!(AreaOrder {
    NameAsc => "name_asc",
    NameDesc => "name_desc",
    DeptAsc => "dept_asc",
    DeptDesc => "dept_desc",
    EmpAsc => "emp_asc",
    EmpDesc => "emp_desc",
    CountAsc => "count_asc",
    CountDesc => "count_desc",
});

sort_keys!(DepartamentoOrder {
    NameAsc => "name_asc",
    NameDesc => "name_desc",
    AreaAsc => "area_asc",
    AreaDesc => "area_desc",
    CountAsc => "count_asc",
    CountDesc => "count_desc",
});

sort_keys!(CargoOrder {
    NameAsc => "name_asc",
    NameDesc => "name_desc",
    CountAsc => "count_asc",
    CountDesc => "count_desc",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_never_fail() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-4")), 1);
        assert_eq!(parse_page(Some(" 3 ")), 3);
        assert_eq!(parse_page(Some("99999")), 99999);
        assert_eq!(parse_page(Some("+2")), 2);
    }

    #[test]
    fn oversized_page_numbers_saturate() {
        assert_eq!(parse_page(Some("99999999999999999999")), usize::MAX);
        assert_eq!(parse_page(Some("000")), 1);
    }

    #[test]
    fn sort_key_tables_are_static() {
        fn keys<O: SortKey>() -> &'static [(&'static str, O)] {
            O::KEYS
        }
        assert_eq!(keys::<DepartamentoOrder>().len(), 6);
        assert_eq!(keys::<AreaOrder>()[7].0, "count_desc");
    }

    #[test]
    fn unknown_sort_keys_fall_back_to_name_ascending() {
        assert_eq!(WorkerOrder::parse(Some("date_desc")), WorkerOrder::DateDesc);
        assert_eq!(WorkerOrder::parse(Some("salary")), WorkerOrder::NameAsc);
        assert_eq!(WorkerOrder::parse(None), WorkerOrder::NameAsc);
        assert_eq!(CargoOrder::parse(Some("dept_asc")), CargoOrder::NameAsc);
        assert_eq!(AreaOrder::parse(Some("emp_desc")).as_str(), "emp_desc");
    }

    #[test]
    fn malformed_filters_are_dropped() {
        let filter = WorkerFilter::resolve(&WorkerQuery {
            q: Some("  ".to_string()),
            rut: Some(" 12.345 ".to_string()),
            area: Some("x1".to_string()),
            cargo: Some("4".to_string()),
            sexo: Some("Z".to_string()),
            ..WorkerQuery::default()
        });
        assert_eq!(filter.q, None);
        assert_eq!(filter.rut.as_deref(), Some("12.345"));
        assert_eq!(filter.area, None);
        assert_eq!(filter.cargo, Some(CargoId(4)));
        assert_eq!(filter.sexo, None);
    }
}

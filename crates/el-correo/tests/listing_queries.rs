//! Worker and catalog listings resolved against a populated memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use el_correo::catalog::{AreaId, CargoId, CatalogService};
use el_correo::identity::NewIdentity;
use el_correo::listing::{CatalogQuery, ListingService, WorkerOrder, WorkerQuery, PAGE_SIZE};
use el_correo::store::{IdentityRepository, MemoryStore, WorkerRepository};
use el_correo::workers::{NewTrabajador, Sexo};

struct Org {
    store: Arc<MemoryStore>,
    listing: ListingService<MemoryStore>,
    finanzas: AreaId,
    analista: CargoId,
}

async fn hire(store: &MemoryStore, username: &str, worker: NewTrabajador) {
    let identity = store
        .insert_identity(NewIdentity {
            username: username.to_string(),
            email: format!("{username}@ejemplo.cl"),
            password_hash: String::new(),
            is_superuser: false,
            is_staff: false,
            groups: BTreeSet::new(),
            date_joined: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
        })
        .await
        .expect("identity");
    store
        .insert_worker(identity.id, worker, Vec::new(), Vec::new())
        .await
        .expect("worker");
}

fn worker(nombres: &str, apellidos: &str, sexo: Sexo) -> NewTrabajador {
    NewTrabajador {
        nombres: nombres.to_string(),
        apellidos: apellidos.to_string(),
        rut: None,
        sexo,
        fecha_ingreso: None,
        area_id: None,
        departamento_id: None,
        cargo_id: None,
        telefono: String::new(),
        direccion: String::new(),
    }
}

/// Twenty filler workers plus three whose names contain "ana".
async fn org() -> Org {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogService::new(store.clone());
    let finanzas = catalog.create_area("Finanzas").await.expect("area").id;
    let analista = catalog.create_cargo("Analista").await.expect("cargo").id;
    let operario = catalog.create_cargo("Operario").await.expect("cargo").id;
    let gerente = catalog.create_cargo("Gerente").await.expect("cargo").id;
    catalog.create_cargo("Auditor").await.expect("cargo");

    for index in 0..20 {
        let mut filler = worker(
            &format!("Persona {index}"),
            &format!("Prueba {index:02}"),
            Sexo::Otro,
        );
        filler.fecha_ingreso = NaiveDate::from_ymd_opt(2023, 1, 1 + index);
        filler.cargo_id = match index {
            0 | 1 => Some(operario),
            2 => Some(gerente),
            _ => None,
        };
        hire(&store, &format!("persona{index}"), filler).await;
    }

    let mut ana = worker("Ana", "Rojas", Sexo::Femenino);
    ana.rut = Some("12.345.678-9".to_string());
    ana.area_id = Some(finanzas);
    ana.cargo_id = Some(analista);
    hire(&store, "arojas", ana).await;

    let mut mariana = worker("Mariana", "Soto", Sexo::Femenino);
    mariana.cargo_id = Some(analista);
    hire(&store, "msoto", mariana).await;

    hire(&store, "lsantana", worker("Luis", "Santana", Sexo::Masculino)).await;

    Org {
        listing: ListingService::new(store.clone()),
        store,
        finanzas,
        analista,
    }
}

fn page(raw: &str) -> WorkerQuery {
    WorkerQuery {
        page: Some(raw.to_string()),
        ..WorkerQuery::default()
    }
}

#[tokio::test]
async fn page_numbers_are_forgiving() {
    let org = org().await;
    assert_eq!(org.store.count_workers().await.expect("count"), 23);

    for raw in ["0", "abc", "-4", ""] {
        let listing = org.listing.workers(&page(raw)).await.expect("listing");
        assert_eq!(listing.page.number, 1, "page {raw:?}");
        assert_eq!(listing.page.items.len(), PAGE_SIZE);
        assert!(!listing.page.has_previous);
    }

    for raw in ["99999", "99999999999999999999999"] {
        let last = org.listing.workers(&page(raw)).await.expect("listing");
        assert_eq!(last.page.number, 3, "page {raw:?}");
        assert_eq!(last.page.num_pages, 3);
        assert_eq!(last.page.items.len(), 3);
        assert!(!last.page.has_next);
    }
}

#[tokio::test]
async fn text_search_matches_either_name_case_insensitively() {
    let org = org().await;
    let listing = org
        .listing
        .workers(&WorkerQuery {
            q: Some("ANA".to_string()),
            ..WorkerQuery::default()
        })
        .await
        .expect("listing");

    let names: Vec<String> = listing
        .page
        .items
        .iter()
        .map(|row| row.trabajador.display_name())
        .collect();
    assert_eq!(names, vec!["Ana Rojas", "Luis Santana", "Mariana Soto"]);
    assert_eq!(listing.filtered_count, 3);
    assert_eq!(listing.total_count, 23);
}

#[tokio::test]
async fn malformed_filters_are_ignored_and_valid_ones_combine() {
    let org = org().await;
    let ignored = org
        .listing
        .workers(&WorkerQuery {
            area: Some("finanzas".to_string()),
            sexo: Some("X".to_string()),
            order: Some("sideways".to_string()),
            ..WorkerQuery::default()
        })
        .await
        .expect("listing");
    assert_eq!(ignored.filtered_count, 23);
    assert_eq!(ignored.filters.order, WorkerOrder::NameAsc);

    let combined = org
        .listing
        .workers(&WorkerQuery {
            area: Some(org.finanzas.0.to_string()),
            cargo: Some(org.analista.0.to_string()),
            sexo: Some("F".to_string()),
            rut: Some("345.678".to_string()),
            ..WorkerQuery::default()
        })
        .await
        .expect("listing");
    assert_eq!(combined.filtered_count, 1);
    assert_eq!(combined.page.items[0].trabajador.nombres, "Ana");
    assert_eq!(combined.page.items[0].area_nombre.as_deref(), Some("Finanzas"));
    assert!(combined.has_rut);
}

#[tokio::test]
async fn missing_hire_dates_sort_first_ascending_and_last_descending() {
    let org = org().await;
    let ascending = org
        .listing
        .workers(&WorkerQuery {
            order: Some("date_asc".to_string()),
            ..WorkerQuery::default()
        })
        .await
        .expect("listing");
    let first: Vec<&str> = ascending
        .page
        .items
        .iter()
        .take(3)
        .map(|row| row.trabajador.nombres.as_str())
        .collect();
    assert_eq!(first, vec!["Ana", "Luis", "Mariana"]);

    let descending = org
        .listing
        .workers(&WorkerQuery {
            order: Some("date_desc".to_string()),
            page: Some("1".to_string()),
            ..WorkerQuery::default()
        })
        .await
        .expect("listing");
    assert_eq!(descending.page.items[0].trabajador.nombres, "Persona 19");
}

#[tokio::test]
async fn cargos_by_headcount_break_ties_by_name() {
    let org = org().await;
    let listing = org
        .listing
        .cargos(&CatalogQuery {
            order: Some("count_desc".to_string()),
            ..CatalogQuery::default()
        })
        .await
        .expect("listing");

    let ranked: Vec<(&str, usize)> = listing
        .page
        .items
        .iter()
        .map(|row| (row.cargo.nombre.as_str(), row.num_trabajadores))
        .collect();
    assert_eq!(
        ranked,
        vec![("Analista", 2), ("Operario", 2), ("Gerente", 1), ("Auditor", 0)]
    );
}

#[tokio::test]
async fn dashboard_and_summaries_reflect_the_store() {
    let org = org().await;
    let counts = org.listing.dashboard().await.expect("counts");
    assert_eq!(counts.total_usuarios, 23);
    assert_eq!(counts.total_trabajadores, 23);
    assert_eq!(counts.total_areas, 1);
    assert_eq!(counts.total_cargos, 4);
    assert_eq!(counts.total_departamentos, 0);

    let summaries = org.listing.worker_summaries().await.expect("summaries");
    assert_eq!(summaries.len(), 23);
    assert_eq!(summaries[0].nombre, "Persona 0 Prueba 00");
}

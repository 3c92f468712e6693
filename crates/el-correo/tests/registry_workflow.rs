//! Catalog and worker registry behavior driven through the public services and the memory store.

mod common {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use el_correo::catalog::CatalogService;
    use el_correo::identity::{Identity, NewIdentity};
    use el_correo::store::{IdentityRepository, MemoryStore};
    use el_correo::workers::WorkerService;

    pub(super) struct Fixture {
        pub store: Arc<MemoryStore>,
        pub catalog: CatalogService<MemoryStore>,
        pub workers: WorkerService<MemoryStore>,
    }

    pub(super) fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            catalog: CatalogService::new(store.clone()),
            workers: WorkerService::new(store.clone()),
            store,
        }
    }

    pub(super) async fn account(store: &MemoryStore, username: &str) -> Identity {
        store
            .insert_identity(NewIdentity {
                username: username.to_string(),
                email: format!("{username}@ejemplo.cl"),
                password_hash: String::new(),
                is_superuser: false,
                is_staff: false,
                groups: BTreeSet::new(),
                date_joined: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
            })
            .await
            .expect("identity inserted")
    }
}

mod catalog {
    use el_correo::catalog::{CatalogAction, CatalogKind, FormStatus};
    use el_correo::error::ServiceError;
    use el_correo::store::CatalogRepository;

    use super::common::fixture;

    #[tokio::test]
    async fn creating_an_area_or_cargo_twice_keeps_one_row() {
        let fixture = fixture();

        let (first, created) = fixture.catalog.get_or_create_area("Finanzas").await.expect("area");
        assert!(created);
        let (second, created) = fixture.catalog.get_or_create_area("Finanzas").await.expect("area");
        assert!(!created);
        assert_eq!(first, second);

        let create = || CatalogAction::Create {
            nombre: "Analista".to_string(),
            area: None,
        };
        let outcome = fixture
            .catalog
            .apply(CatalogKind::Cargo, create(), true)
            .await
            .expect("first create");
        assert_eq!(outcome.form_status, FormStatus::Success);
        let outcome = fixture
            .catalog
            .apply(CatalogKind::Cargo, create(), true)
            .await
            .expect("second create");
        assert_eq!(outcome.form_status, FormStatus::Info);

        let counts = fixture.store.catalog_counts().await.expect("counts");
        assert_eq!(counts.areas, 1);
        assert_eq!(counts.cargos, 1);
    }

    #[tokio::test]
    async fn strict_creation_reports_the_duplicate_on_the_name_field() {
        let fixture = fixture();
        fixture.catalog.create_cargo("Operario").await.expect("created");
        match fixture.catalog.create_cargo("Operario").await {
            Err(ServiceError::Validation(errors)) => assert!(errors.contains("nombre")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn writes_without_capability_are_refused_inline() {
        let fixture = fixture();
        let outcome = fixture
            .catalog
            .apply(
                CatalogKind::Area,
                CatalogAction::Create {
                    nombre: "TI".to_string(),
                    area: None,
                },
                false,
            )
            .await
            .expect("outcome");
        assert_eq!(outcome.form_status, FormStatus::Error);
        assert_eq!(fixture.store.catalog_counts().await.expect("counts").areas, 0);
    }

    #[tokio::test]
    async fn deleting_a_missing_row_is_an_inline_error() {
        let fixture = fixture();
        let outcome = fixture
            .catalog
            .apply(CatalogKind::Departamento, CatalogAction::Delete { id: Some(41) }, true)
            .await
            .expect("outcome");
        assert_eq!(outcome.form_status, FormStatus::Error);
    }
}

mod referential_actions {
    use el_correo::store::{CatalogRepository, IdentityRepository, WorkerRepository};
    use el_correo::workers::{CargaRow, ContactoRow, IntakeForm, PersonalForm};

    use super::common::{account, fixture};

    fn intake_form(identity: i64, area: i64, departamento: i64, cargo: i64) -> IntakeForm {
        IntakeForm {
            identity: Some(identity),
            personal: PersonalForm {
                nombres: "Ana".to_string(),
                apellidos: "Rojas".to_string(),
                sexo: "F".to_string(),
                ..PersonalForm::default()
            },
            area: Some(area),
            departamento: Some(departamento),
            cargo: Some(cargo),
            contactos: vec![ContactoRow {
                nombre: "Pedro Rojas".to_string(),
                parentesco: "Hermano".to_string(),
                telefono: "+56 9 1234 5678".to_string(),
                ..ContactoRow::default()
            }],
            cargas: vec![CargaRow {
                nombre: "Tomás".to_string(),
                parentesco: "Hijo".to_string(),
                fecha_nacimiento: Some("2015-06-01".to_string()),
                ..CargaRow::default()
            }],
        }
    }

    #[tokio::test]
    async fn deleting_an_identity_cascades_to_worker_and_dependents() {
        let fixture = fixture();
        let area = fixture.catalog.create_area("Finanzas").await.expect("area");
        let depto = fixture
            .catalog
            .create_departamento("Tesorería", area.id)
            .await
            .expect("departamento");
        let cargo = fixture.catalog.create_cargo("Analista").await.expect("cargo");
        let identity = account(&fixture.store, "ana").await;

        let worker = fixture
            .workers
            .intake(intake_form(identity.id.0, area.id.0, depto.id.0, cargo.id.0))
            .await
            .expect("intake");
        assert_eq!(fixture.store.contactos(worker.id).await.expect("contactos").len(), 1);
        assert_eq!(fixture.store.cargas(worker.id).await.expect("cargas").len(), 1);

        fixture.store.delete_identity(identity.id).await.expect("delete");
        assert!(fixture.store.fetch_worker(worker.id).await.expect("fetch").is_none());
        assert!(fixture.store.contactos(worker.id).await.expect("contactos").is_empty());
        assert!(fixture.store.cargas(worker.id).await.expect("cargas").is_empty());
        assert_eq!(fixture.store.catalog_counts().await.expect("counts").cargos, 1);
    }

    #[tokio::test]
    async fn deleting_a_departamento_nullifies_without_deleting_the_worker() {
        let fixture = fixture();
        let area = fixture.catalog.create_area("Finanzas").await.expect("area");
        let depto = fixture
            .catalog
            .create_departamento("Tesorería", area.id)
            .await
            .expect("departamento");
        let cargo = fixture.catalog.create_cargo("Analista").await.expect("cargo");
        let identity = account(&fixture.store, "ana").await;
        let worker = fixture
            .workers
            .intake(intake_form(identity.id.0, area.id.0, depto.id.0, cargo.id.0))
            .await
            .expect("intake");

        fixture.store.delete_departamento(depto.id).await.expect("delete");
        let worker = fixture
            .store
            .fetch_worker(worker.id)
            .await
            .expect("fetch")
            .expect("worker survives");
        assert_eq!(worker.departamento_id, None);
        assert_eq!(worker.area_id, Some(area.id));
        assert_eq!(worker.cargo_id, Some(cargo.id));
    }

    #[tokio::test]
    async fn deleting_an_area_removes_its_departamentos_and_clears_placements() {
        let fixture = fixture();
        let area = fixture.catalog.create_area("TI").await.expect("area");
        let depto = fixture
            .catalog
            .create_departamento("Desarrollo", area.id)
            .await
            .expect("departamento");
        let cargo = fixture.catalog.create_cargo("Desarrollador").await.expect("cargo");
        let identity = account(&fixture.store, "ana").await;
        let worker = fixture
            .workers
            .intake(intake_form(identity.id.0, area.id.0, depto.id.0, cargo.id.0))
            .await
            .expect("intake");

        fixture.store.delete_area(area.id).await.expect("delete");
        assert!(fixture.store.fetch_departamento(depto.id).await.expect("fetch").is_none());
        let worker = fixture
            .store
            .fetch_worker(worker.id)
            .await
            .expect("fetch")
            .expect("worker survives");
        assert_eq!(worker.area_id, None);
        assert_eq!(worker.departamento_id, None);
    }
}

mod worker_records {
    use std::sync::Arc;

    use el_correo::error::ServiceError;
    use el_correo::identity::{
        AccountForm, IdentityService, PasswordConfig, PasswordHasher, SignupForm,
    };
    use el_correo::store::WorkerRepository;
    use el_correo::workers::{
        today, CargaRow, ContactoRow, IntakeForm, PersonalForm, ProfileForm, Sexo, WorkerDraft,
        SIGNUP_PLACEHOLDER,
    };
    use secrecy::SecretString;

    use super::common::{account, fixture};

    #[tokio::test]
    async fn finanzas_tesoreria_analista_worker_defaults_hire_date_and_surnames() {
        let fixture = fixture();
        let area = fixture.catalog.create_area("Finanzas").await.expect("area");
        let depto = fixture
            .catalog
            .create_departamento("Tesorería", area.id)
            .await
            .expect("departamento");
        let cargo = fixture.catalog.create_cargo("Analista").await.expect("cargo");

        let hasher =
            PasswordHasher::new(SecretString::from("test".to_string()), PasswordConfig::low_cost());
        let identities = IdentityService::new(fixture.store.clone(), Arc::new(hasher));
        let (_, worker) = identities
            .signup(SignupForm {
                account: AccountForm {
                    username: "camila".to_string(),
                    email: "camila@ejemplo.cl".to_string(),
                    password1: "clave-segura-1".to_string(),
                    password2: "clave-segura-1".to_string(),
                },
                nombres: "Camila".to_string(),
                apellidos: "Pérez".to_string(),
                sexo: "F".to_string(),
                area: Some(area.id.0),
                departamento: Some(depto.id.0),
                cargo: Some(cargo.id.0),
                ..SignupForm::default()
            })
            .await
            .expect("signup");
        assert_eq!(worker.sexo, Sexo::Femenino);
        assert_eq!(worker.fecha_ingreso, Some(today()));
        assert_eq!(worker.departamento_id, Some(depto.id));
        assert_eq!(worker.cargo_id, Some(cargo.id));

        let seeded = WorkerDraft {
            nombres: Some("Camila".to_string()),
            sexo: Some(Sexo::Femenino),
            area_id: Some(area.id),
            departamento_id: Some(depto.id),
            cargo_id: Some(cargo.id),
            ..WorkerDraft::default()
        }
        .with_fallbacks("camila", SIGNUP_PLACEHOLDER, today());
        assert_eq!(seeded.apellidos, SIGNUP_PLACEHOLDER);
        assert_eq!(seeded.fecha_ingreso, Some(today()));
    }

    #[tokio::test]
    async fn departamento_outside_the_area_is_rejected() {
        let fixture = fixture();
        let finanzas = fixture.catalog.create_area("Finanzas").await.expect("area");
        let ti = fixture.catalog.create_area("TI").await.expect("area");
        let desarrollo = fixture
            .catalog
            .create_departamento("Desarrollo", ti.id)
            .await
            .expect("departamento");
        let identity = account(&fixture.store, "luis").await;

        let result = fixture.workers.intake(IntakeForm {
            identity: Some(identity.id.0),
            personal: PersonalForm {
                nombres: "Luis".to_string(),
                apellidos: "Soto".to_string(),
                sexo: "M".to_string(),
                ..PersonalForm::default()
            },
            area: Some(finanzas.id.0),
            departamento: Some(desarrollo.id.0),
            ..IntakeForm::default()
        })
        .await;
        match result {
            Err(ServiceError::Validation(errors)) => assert!(errors.contains("departamento")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(fixture.store.count_workers().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn profile_edit_with_one_bad_dependent_commits_nothing() {
        let fixture = fixture();
        let identity = account(&fixture.store, "ana").await;
        fixture
            .workers
            .intake(IntakeForm {
                identity: Some(identity.id.0),
                personal: PersonalForm {
                    nombres: "Ana".to_string(),
                    apellidos: "Rojas".to_string(),
                    sexo: "F".to_string(),
                    ..PersonalForm::default()
                },
                ..IntakeForm::default()
            })
            .await
            .expect("intake");
        let before = fixture
            .workers
            .profile(identity.id)
            .await
            .expect("profile")
            .expect("linked");

        let result = fixture.workers.update_profile(
            identity.id,
            ProfileForm {
                personal: PersonalForm {
                    nombres: "Ana María".to_string(),
                    apellidos: "Rojas".to_string(),
                    sexo: "F".to_string(),
                    ..PersonalForm::default()
                },
                contactos: vec![ContactoRow {
                    nombre: "Pedro Rojas".to_string(),
                    parentesco: "Hermano".to_string(),
                    telefono: "555-0101".to_string(),
                    ..ContactoRow::default()
                }],
                cargas: vec![CargaRow {
                    parentesco: "Hija".to_string(),
                    fecha_nacimiento: Some("2018-02-30".to_string()),
                    ..CargaRow::default()
                }],
            },
        )
        .await;
        match result {
            Err(ServiceError::Validation(errors)) => {
                assert!(errors.contains("cargas.0.nombre"));
                assert!(errors.contains("cargas.0.fecha_nacimiento"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let after = fixture
            .workers
            .profile(identity.id)
            .await
            .expect("profile")
            .expect("linked");
        assert_eq!(after, before);
        assert_eq!(after.trabajador.nombres, "Ana");
        assert!(after.contactos.is_empty());
    }

    #[tokio::test]
    async fn profile_edit_updates_and_deletes_owned_rows() {
        let fixture = fixture();
        let identity = account(&fixture.store, "ana").await;
        fixture
            .workers
            .intake(IntakeForm {
                identity: Some(identity.id.0),
                personal: PersonalForm {
                    nombres: "Ana".to_string(),
                    apellidos: "Rojas".to_string(),
                    sexo: "F".to_string(),
                    ..PersonalForm::default()
                },
                contactos: vec![ContactoRow {
                    nombre: "Pedro".to_string(),
                    parentesco: "Hermano".to_string(),
                    telefono: "555-0101".to_string(),
                    ..ContactoRow::default()
                }],
                ..IntakeForm::default()
            })
            .await
            .expect("intake");
        let contacto = fixture
            .workers
            .profile(identity.id)
            .await
            .expect("profile")
            .expect("linked")
            .contactos[0]
            .id;

        let updated = fixture
            .workers
            .update_profile(
                identity.id,
                ProfileForm {
                    personal: PersonalForm {
                        nombres: "Ana".to_string(),
                        apellidos: "Rojas Vega".to_string(),
                        sexo: "F".to_string(),
                        telefono: "555-0199".to_string(),
                        ..PersonalForm::default()
                    },
                    contactos: vec![ContactoRow {
                        id: Some(contacto.0),
                        delete: true,
                        ..ContactoRow::default()
                    }],
                    cargas: vec![CargaRow {
                        nombre: "Tomás".to_string(),
                        parentesco: "Hijo".to_string(),
                        fecha_nacimiento: Some("2016-09-12".to_string()),
                        ..CargaRow::default()
                    }],
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.trabajador.apellidos, "Rojas Vega");
        assert_eq!(updated.trabajador.telefono, "555-0199");
        assert!(updated.contactos.is_empty());
        assert_eq!(updated.cargas.len(), 1);
        assert_eq!(updated.cargas[0].nombre, "Tomás");
    }

    #[tokio::test]
    async fn second_intake_for_the_same_account_is_rejected() {
        let fixture = fixture();
        let identity = account(&fixture.store, "ana").await;
        let form = || IntakeForm {
            identity: Some(identity.id.0),
            personal: PersonalForm {
                nombres: "Ana".to_string(),
                apellidos: "Rojas".to_string(),
                sexo: "F".to_string(),
                ..PersonalForm::default()
            },
            ..IntakeForm::default()
        };
        fixture.workers.intake(form()).await.expect("first intake");
        assert!(fixture.workers.unlinked_identities().await.expect("unlinked").is_empty());
        match fixture.workers.intake(form()).await {
            Err(ServiceError::Validation(errors)) => assert!(errors.contains("identity")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

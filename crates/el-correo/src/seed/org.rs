use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::{SeedReport, Seeder};
use crate::access::{ADMINISTRADOR, JEFE_RRHH};
use crate::error::ServiceError;
use crate::store::Store;
use crate::workers::{today, CargaFields, NewTrabajador, Sexo};

const DEMO_AREAS: [(&str, [&str; 2]); 3] = [
    ("Operaciones", ["Bodega", "Despacho"]),
    ("Finanzas", ["Contabilidad", "Tesorería"]),
    ("TI", ["Desarrollo", "Infraestructura"]),
];

const DEMO_CARGOS: [&str; 5] = [ADMINISTRADOR, JEFE_RRHH, "Desarrollador", "Analista", "Operario"];

/// (username, area, departamento, cargo, sexo) for the sample accounts.
const DEMO_PLACEMENTS: [(&str, &str, &str, &str, Sexo); 4] = [
    ("admin_user", "Operaciones", "Bodega", ADMINISTRADOR, Sexo::Masculino),
    ("manager_user", "Finanzas", "Contabilidad", JEFE_RRHH, Sexo::Femenino),
    ("dev_user", "TI", "Desarrollo", "Desarrollador", Sexo::Masculino),
    ("viewer_user", "Operaciones", "Despacho", "Analista", Sexo::Otro),
];

const PARENTESCOS: [&str; 5] = ["Hijo", "Hija", "Cónyuge", "Padre", "Madre"];
const NOMBRES: [&str; 8] = [
    "Alex",
    "Sam",
    "Camila",
    "Diego",
    "Valentina",
    "Juan",
    "Sofía",
    "Martín",
];

const SIN_RUT: &str = "SIN-RUT";

/// `admin_user` -> `Admin User`.
fn display_from_username(username: &str) -> String {
    username
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn random_birth_date(rng: &mut impl Rng, today: NaiveDate) -> NaiveDate {
    let years: i64 = rng.random_range(1..=25);
    let jitter: i64 = rng.random_range(0..365);
    today - Duration::days(years * 365 + jitter)
}

impl<S> Seeder<S>
where
    S: Store + ?Sized + 'static,
{
    /// Three areas with two departments each, five job titles, and worker records placed
    /// for the sample accounts. Accounts that are missing or already linked are skipped.
    pub async fn seed_demo_org(&self) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::new("seed_demo_org");

        let mut departamentos = Vec::new();
        for (area_nombre, nombres) in DEMO_AREAS {
            let (area, created) = self.store.get_or_create_area(area_nombre).await?;
            report.record(created);
            for nombre in nombres {
                let (departamento, created) =
                    self.store.get_or_create_departamento(nombre, area.id).await?;
                report.record(created);
                departamentos.push((area.clone(), departamento));
            }
        }

        let mut cargos = Vec::new();
        for nombre in DEMO_CARGOS {
            let (cargo, created) = self.store.get_or_create_cargo(nombre).await?;
            report.record(created);
            cargos.push(cargo);
        }

        for (username, area_nombre, departamento_nombre, cargo_nombre, sexo) in DEMO_PLACEMENTS {
            let Some(identity) = self.store.identity_by_username(username).await? else {
                warn!(username, "demo placement skipped, account missing");
                continue;
            };
            if self.store.worker_for_identity(identity.id).await?.is_some() {
                report.existing += 1;
                continue;
            }
            let placement = departamentos.iter().find(|(area, departamento)| {
                area.nombre == area_nombre && departamento.nombre == departamento_nombre
            });
            let cargo = cargos.iter().find(|cargo| cargo.nombre == cargo_nombre);
            let worker = NewTrabajador {
                nombres: display_from_username(username),
                apellidos: "Demo".to_string(),
                rut: None,
                sexo,
                fecha_ingreso: NaiveDate::from_ymd_opt(2024, 1, 15),
                area_id: placement.map(|(area, _)| area.id),
                departamento_id: placement.map(|(_, departamento)| departamento.id),
                cargo_id: cargo.map(|cargo| cargo.id),
                telefono: "555-0101".to_string(),
                direccion: "Dirección Demo 123".to_string(),
            };
            self.store
                .insert_worker(identity.id, worker, Vec::new(), Vec::new())
                .await?;
            report.created += 1;
            debug!(username, "demo worker placed");
        }

        Ok(report.logged())
    }

    /// Top every worker up to `per_worker` random dependents. With `wipe`, every existing
    /// dependent is removed first.
    pub async fn seed_cargas(
        &self,
        per_worker: usize,
        wipe: bool,
    ) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::new("seed_cargas");
        let per_worker = per_worker.max(1);
        if wipe {
            report.deleted = self.store.delete_all_cargas().await?;
        }

        let mut rng = StdRng::from_rng(&mut rand::rng());
        let today = today();
        for worker in self.store.workers().await? {
            let existing = self.store.cargas(worker.id).await?.len();
            if existing >= per_worker {
                report.existing += existing;
                continue;
            }
            for _ in existing..per_worker {
                let base = NOMBRES.choose(&mut rng).copied().unwrap_or("Alex");
                let parentesco = PARENTESCOS.choose(&mut rng).copied().unwrap_or("Hijo");
                let suffix: u8 = rng.random_range(1..=99);
                let fields = CargaFields {
                    nombre: format!("{base} {suffix}"),
                    parentesco: parentesco.to_string(),
                    fecha_nacimiento: Some(random_birth_date(&mut rng, today)),
                };
                self.store.insert_carga(worker.id, fields).await?;
                report.created += 1;
            }
        }

        Ok(report.logged())
    }

    /// Give every account a worker record and fill required worker fields left blank.
    pub async fn repair(&self) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::new("repair");
        let today = today();

        for identity in self.store.identities().await? {
            if self.store.worker_for_identity(identity.id).await?.is_some() {
                continue;
            }
            let worker = NewTrabajador {
                nombres: identity.username.clone(),
                apellidos: "Demo".to_string(),
                rut: Some(SIN_RUT.to_string()),
                sexo: Sexo::Otro,
                fecha_ingreso: Some(today),
                area_id: None,
                departamento_id: None,
                cargo_id: None,
                telefono: String::new(),
                direccion: String::new(),
            };
            self.store
                .insert_worker(identity.id, worker, Vec::new(), Vec::new())
                .await?;
            report.created += 1;
        }

        for mut worker in self.store.workers().await? {
            let before = worker.clone();
            if worker.nombres.trim().is_empty() {
                worker.nombres = "SinNombre".to_string();
            }
            if worker.apellidos.trim().is_empty() {
                worker.apellidos = "SinApellido".to_string();
            }
            if worker.rut.as_deref().map_or(true, |rut| rut.trim().is_empty()) {
                worker.rut = Some(SIN_RUT.to_string());
            }
            worker.fecha_ingreso = worker.fecha_ingreso.or(Some(today));
            if worker != before {
                self.store.replace_worker(worker).await?;
                report.updated += 1;
            } else {
                report.existing += 1;
            }
        }

        Ok(report.logged())
    }
}

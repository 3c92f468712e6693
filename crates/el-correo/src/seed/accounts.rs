use std::collections::BTreeSet;

use tracing::debug;

use super::{SeedReport, Seeder, UserSeedOptions};
use crate::access::{ADMINISTRADOR, JEFE_RRHH, ROLE_GROUPS};
use crate::error::ServiceError;
use crate::identity::{hash_blocking, Identity, NewIdentity};
use crate::store::Store;
use crate::workers::{today, NewTrabajador, Sexo};

/// (username, email, password, group) for the fixed sample accounts.
const BASE_USERS: [(&str, &str, &str, &str); 4] = [
    ("admin_user", "admin@example.com", "adminpass", "admin"),
    ("manager_user", "manager@example.com", "managerpass", "manager"),
    ("dev_user", "dev@example.com", "devpass", "developer"),
    ("viewer_user", "viewer@example.com", "viewerpass", "viewer"),
];

/// Flags an account should carry after seeding.
struct AccountSpec<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    is_staff: bool,
    is_superuser: bool,
    groups: BTreeSet<String>,
    reset_password: bool,
}

impl<S> Seeder<S>
where
    S: Store + ?Sized + 'static,
{
    /// Get-or-create the three role groups.
    pub async fn init_roles(&self) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::new("init_roles");
        for group in ROLE_GROUPS {
            report.record(self.store.ensure_group(group).await?);
        }
        Ok(report.logged())
    }

    /// Sample accounts in generic groups. Extra accounts are assigned to groups round-robin
    /// and named `{prefix}_{group}_{n}`, so re-runs find the same usernames.
    pub async fn seed_users(&self, options: &UserSeedOptions) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::new("seed_users");
        for group in &options.groups {
            self.store.ensure_group(group).await?;
        }

        if options.create_base {
            for (username, email, password, group) in BASE_USERS {
                if !options.groups.iter().any(|known| known == group) {
                    self.store.ensure_group(group).await?;
                }
                let spec = AccountSpec {
                    username,
                    email,
                    password,
                    is_staff: options.staff_groups.iter().any(|staff| staff == group),
                    is_superuser: username == options.superuser,
                    groups: BTreeSet::from([group.to_string()]),
                    reset_password: options.update_password,
                };
                self.upsert_account(&spec, &mut report).await?;
            }
        }

        if !options.groups.is_empty() {
            for n in 1..=options.extra {
                let group = &options.groups[(n - 1) % options.groups.len()];
                let username = format!("{}_{}_{}", options.prefix, group, n);
                let email = format!("{username}@example.com");
                let spec = AccountSpec {
                    username: &username,
                    email: &email,
                    password: &options.password,
                    is_staff: options.staff_groups.iter().any(|staff| staff == group),
                    is_superuser: false,
                    groups: BTreeSet::from([group.clone()]),
                    reset_password: options.update_password,
                };
                self.upsert_account(&spec, &mut report).await?;
            }
        }

        Ok(report.logged())
    }

    /// The administrator and HR chief accounts with their catalog placement and workers.
    pub async fn seed_rrhh(&self) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::new("seed_rrhh");
        for group in ROLE_GROUPS {
            self.store.ensure_group(group).await?;
        }

        let admin = self.upsert_account(
            &AccountSpec {
                username: "admin",
                email: "admin@ejemplo.cl",
                password: "admin123",
                is_staff: true,
                is_superuser: true,
                groups: BTreeSet::from([ADMINISTRADOR.to_string()]),
                reset_password: false,
            },
            &mut report,
        )
        .await?;
        let leo = self.upsert_account(
            &AccountSpec {
                username: "leo",
                email: "leo@ejemplo.cl",
                password: "leo123",
                is_staff: true,
                is_superuser: false,
                groups: BTreeSet::from([JEFE_RRHH.to_string()]),
                reset_password: false,
            },
            &mut report,
        )
        .await?;

        let (area, created) = self.store.get_or_create_area("RR.HH.").await?;
        report.record(created);
        let (departamento, created) = self
            .store
            .get_or_create_departamento("Gestión", area.id)
            .await?;
        report.record(created);
        let (jefe, created) = self.store.get_or_create_cargo(JEFE_RRHH).await?;
        report.record(created);
        let (administrador, created) =
            self.store.get_or_create_cargo(ADMINISTRADOR).await?;
        report.record(created);

        let placements = [
            (&admin, "Admin", "Sistema", Sexo::Otro, administrador.id),
            (&leo, "Leo", "RRHH", Sexo::Masculino, jefe.id),
        ];
        for (identity, nombres, apellidos, sexo, cargo_id) in placements {
            match self.store.worker_for_identity(identity.id).await? {
                None => {
                    let worker = NewTrabajador {
                        nombres: nombres.to_string(),
                        apellidos: apellidos.to_string(),
                        rut: None,
                        sexo,
                        fecha_ingreso: None,
                        area_id: Some(area.id),
                        departamento_id: Some(departamento.id),
                        cargo_id: Some(cargo_id),
                        telefono: String::new(),
                        direccion: String::new(),
                    };
                    self.store
                        .insert_worker(identity.id, worker, Vec::new(), Vec::new())
                        .await?;
                    report.created += 1;
                }
                Some(mut worker) => {
                    let before = worker.clone();
                    if worker.nombres.is_empty() {
                        worker.nombres = nombres.to_string();
                    }
                    if worker.apellidos.is_empty() {
                        worker.apellidos = apellidos.to_string();
                    }
                    worker.area_id = worker.area_id.or(Some(area.id));
                    worker.departamento_id = worker.departamento_id.or(Some(departamento.id));
                    worker.cargo_id = worker.cargo_id.or(Some(cargo_id));
                    if worker != before {
                        self.store.replace_worker(worker).await?;
                        report.updated += 1;
                    } else {
                        report.existing += 1;
                    }
                }
            }
        }

        Ok(report.logged())
    }

    /// Create the account or bring an existing one's flags and groups in line with `spec`.
    /// The password is only written on creation unless `reset_password` is set.
    async fn upsert_account(
        &self,
        spec: &AccountSpec<'_>,
        report: &mut SeedReport,
    ) -> Result<Identity, ServiceError> {
        if let Some(mut identity) = self.store.identity_by_username(spec.username).await? {
            let before = identity.clone();
            identity.is_staff = spec.is_staff;
            identity.is_superuser = spec.is_superuser;
            identity.groups = spec.groups.clone();
            if identity.email.is_empty() {
                identity.email = spec.email.to_string();
            }
            if spec.reset_password {
                identity.password_hash =
                    hash_blocking(self.hasher.clone(), spec.password.to_string()).await?;
            }
            if identity != before {
                self.store.replace_identity(identity.clone()).await?;
                report.updated += 1;
                debug!(username = spec.username, "seeded account updated");
            } else {
                report.existing += 1;
            }
            return Ok(identity);
        }

        let password_hash = hash_blocking(self.hasher.clone(), spec.password.to_string()).await?;
        let identity = self
            .store
            .insert_identity(NewIdentity {
                username: spec.username.to_string(),
                email: spec.email.to_string(),
                password_hash,
                is_superuser: spec.is_superuser,
                is_staff: spec.is_staff,
                groups: spec.groups.clone(),
                date_joined: today(),
            })
            .await?;
        report.created += 1;
        debug!(username = spec.username, "seeded account created");
        Ok(identity)
    }
}

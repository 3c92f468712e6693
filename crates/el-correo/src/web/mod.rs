//! HTTP surface: session-authenticated pages rendered as JSON view models.
//!
//! Permission denials redirect (303) instead of answering 403, and anonymous requests to
//! protected pages are sent to `/login`.

mod accounts;
mod catalog;
mod form;
mod registry;
mod session;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use chrono::Duration;
use serde::Serialize;

pub use form::Form;
pub use session::{clear_session_cookie, session_cookie, session_token, CurrentUser};

use crate::catalog::{Area, Cargo, CatalogService, Departamento};
use crate::error::ServiceError;
use crate::identity::{IdentityService, PasswordHasher, DEFAULT_SESSION_TTL_SECS};
use crate::listing::ListingService;
use crate::store::Store;
use crate::workers::{Sexo, WorkerService};

/// Services shared by every handler, built once over one store.
pub struct AppContext<S> {
    pub store: Arc<S>,
    pub catalog: CatalogService<S>,
    pub workers: WorkerService<S>,
    pub identity: IdentityService<S>,
    pub listing: ListingService<S>,
}

impl<S> AppContext<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>, hasher: Arc<PasswordHasher>) -> Self {
        Self::with_session_ttl(store, hasher, Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    pub fn with_session_ttl(store: Arc<S>, hasher: Arc<PasswordHasher>, ttl: Duration) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            workers: WorkerService::new(store.clone()),
            identity: IdentityService::with_session_ttl(store.clone(), hasher, ttl),
            listing: ListingService::new(store.clone()),
            store,
        }
    }

    /// Options for the placement and sex selectors, each sorted by name.
    pub async fn choices(&self) -> Result<Choices, ServiceError> {
        let mut areas: Vec<Area> = self
            .store
            .area_rows()
            .await?
            .into_iter()
            .map(|row| row.area)
            .collect();
        areas.sort_by(|left, right| left.nombre.cmp(&right.nombre));

        let mut departamentos = self.store.departamento_rows().await?;
        departamentos.sort_by(|left, right| {
            left.area_nombre
                .cmp(&right.area_nombre)
                .then_with(|| left.departamento.nombre.cmp(&right.departamento.nombre))
        });

        let mut cargos: Vec<Cargo> = self
            .store
            .cargo_rows()
            .await?
            .into_iter()
            .map(|row| row.cargo)
            .collect();
        cargos.sort_by(|left, right| left.nombre.cmp(&right.nombre));

        Ok(Choices {
            areas,
            departamentos: departamentos.into_iter().map(|row| row.departamento).collect(),
            cargos,
            sexos: Sexo::ALL
                .into_iter()
                .map(|sexo| SexoChoice {
                    code: sexo.code(),
                    label: sexo.label(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SexoChoice {
    pub code: &'static str,
    pub label: &'static str,
}

/// Selector options rendered next to worker forms.
#[derive(Debug, Clone, Serialize)]
pub struct Choices {
    pub areas: Vec<Area>,
    pub departamentos: Vec<Departamento>,
    pub cargos: Vec<Cargo>,
    pub sexos: Vec<SexoChoice>,
}

/// Every page and JSON endpoint of the application.
pub fn router<S>(context: Arc<AppContext<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/", get(accounts::root))
        .route(
            "/login",
            get(accounts::login_page).post(accounts::login::<S>),
        )
        .route(
            "/logout",
            get(accounts::logout::<S>).post(accounts::logout::<S>),
        )
        .route(
            "/signup",
            get(accounts::signup_page::<S>).post(accounts::signup::<S>),
        )
        .route(
            "/password-change",
            get(accounts::password_change_page).post(accounts::password_change::<S>),
        )
        .route(
            "/password-change/done",
            get(accounts::password_change_done),
        )
        .route(
            "/usuarios/nuevo",
            get(accounts::create_user_page::<S>).post(accounts::create_user::<S>),
        )
        .route("/lista/", get(accounts::identity_list::<S>))
        .route("/dashboard", get(registry::dashboard::<S>))
        .route("/deshboard", get(registry::dashboard_alias))
        .route(
            "/perfil",
            get(registry::profile_page::<S>).post(registry::update_profile::<S>),
        )
        .route("/trabajadores", get(registry::worker_list::<S>))
        .route(
            "/trabajadores/nuevo",
            get(registry::intake_page::<S>).post(registry::intake::<S>),
        )
        .route("/api/dashboard", get(registry::api_dashboard::<S>))
        .route("/api/trabajadores", get(registry::api_workers::<S>))
        .route(
            "/areas",
            get(catalog::areas_page::<S>).post(catalog::areas_action::<S>),
        )
        .route(
            "/departamentos",
            get(catalog::departamentos_page::<S>).post(catalog::departamentos_action::<S>),
        )
        .route(
            "/cargos",
            get(catalog::cargos_page::<S>).post(catalog::cargos_action::<S>),
        )
        .with_state(context)
}

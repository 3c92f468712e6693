use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::form::Form;
use super::session::CurrentUser;
use super::{AppContext, Choices};
use crate::access::{Capabilities, Capability};
use crate::error::ServiceError;
use crate::identity::IdentityId;
use crate::listing::{DashboardCounts, WorkerListing, WorkerQuery};
use crate::store::Store;
use crate::workers::{IntakeForm, ProfileForm, Trabajador, WorkerProfile, WorkerRow};

#[derive(Debug, Serialize)]
struct Dashboard {
    username: String,
    #[serde(flatten)]
    counts: DashboardCounts,
    #[serde(flatten)]
    capabilities: Capabilities,
}

#[derive(Debug, Serialize)]
struct ProfilePage {
    #[serde(flatten)]
    profile: WorkerProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_type: Option<&'static str>,
    can_view_trabajadores: bool,
    can_view_users: bool,
}

#[derive(Debug, Serialize)]
struct WorkerListPage {
    #[serde(flatten)]
    listing: WorkerListing<WorkerRow>,
    #[serde(flatten)]
    counts: DashboardCounts,
    #[serde(flatten)]
    choices: Choices,
}

#[derive(Debug, Serialize)]
struct UnlinkedIdentity {
    id: IdentityId,
    username: String,
}

#[derive(Debug, Serialize)]
struct IntakePage {
    identities: Vec<UnlinkedIdentity>,
    #[serde(flatten)]
    choices: Choices,
}

#[derive(Debug, Serialize)]
struct IntakeResult {
    message: &'static str,
    message_type: &'static str,
    trabajador: Trabajador,
    identities: Vec<UnlinkedIdentity>,
}

async fn unlinked<S>(context: &AppContext<S>) -> Result<Vec<UnlinkedIdentity>, ServiceError>
where
    S: Store + 'static,
{
    Ok(context
        .workers
        .unlinked_identities()
        .await?
        .into_iter()
        .map(|identity| UnlinkedIdentity {
            id: identity.id,
            username: identity.username,
        })
        .collect())
}

pub(crate) async fn dashboard<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let body = Dashboard {
        username: user.identity.username,
        counts: context.listing.dashboard().await?,
        capabilities: user.capabilities,
    };
    Ok(Json(body).into_response())
}

pub(crate) async fn dashboard_alias() -> Redirect {
    Redirect::to("/dashboard")
}

pub(crate) async fn api_dashboard<S>(
    State(context): State<Arc<AppContext<S>>>,
    _user: CurrentUser,
) -> Result<Json<DashboardCounts>, ServiceError>
where
    S: Store + 'static,
{
    Ok(Json(context.listing.dashboard().await?))
}

pub(crate) async fn api_workers<S>(
    State(context): State<Arc<AppContext<S>>>,
    _user: CurrentUser,
) -> Result<Json<serde_json::Value>, ServiceError>
where
    S: Store + 'static,
{
    let trabajadores = context.listing.worker_summaries().await?;
    Ok(Json(json!({ "trabajadores": trabajadores })))
}

fn render_profile(
    profile: WorkerProfile,
    capabilities: &Capabilities,
    saved: bool,
) -> Json<ProfilePage> {
    Json(ProfilePage {
        profile,
        message: saved.then_some("Datos actualizados correctamente."),
        message_type: saved.then_some("success"),
        can_view_trabajadores: capabilities.allows(Capability::ViewWorkers),
        can_view_users: capabilities.allows(Capability::ViewIdentities),
    })
}

pub(crate) async fn profile_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    match context.workers.profile(user.identity.id).await? {
        Some(profile) => Ok(render_profile(profile, &user.capabilities, false).into_response()),
        None => Ok(Redirect::to("/dashboard").into_response()),
    }
}

pub(crate) async fn update_profile<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    form: Result<Form<ProfileForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let owner = user.identity.id;
    if !user.capabilities.allows(Capability::EditProfile { owner })
        || context.workers.profile(owner).await?.is_none()
    {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let Form(form) = form?;
    let profile = context.workers.update_profile(owner, form).await?;
    Ok(render_profile(profile, &user.capabilities, true).into_response())
}

pub(crate) async fn worker_list<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<WorkerQuery>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::ViewWorkers) {
        return Ok(Redirect::to("/perfil").into_response());
    }
    let page = WorkerListPage {
        listing: context.listing.workers(&query).await?,
        counts: context.listing.dashboard().await?,
        choices: context.choices().await?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn intake_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::CreateWorker) {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let page = IntakePage {
        identities: unlinked(&context).await?,
        choices: context.choices().await?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn intake<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    form: Result<Form<IntakeForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::CreateWorker) {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let Form(form) = form?;
    let trabajador = context.workers.intake(form).await?;
    let body = IntakeResult {
        message: "Trabajador registrado correctamente.",
        message_type: "success",
        trabajador,
        identities: unlinked(&context).await?,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

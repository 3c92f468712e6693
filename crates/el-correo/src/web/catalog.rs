use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::form::Form;
use super::session::CurrentUser;
use super::AppContext;
use crate::access::Capability;
use crate::catalog::{Area, CatalogAction, CatalogForm, CatalogKind, CatalogOutcome};
use crate::error::ServiceError;
use crate::listing::{CatalogListing, CatalogQuery};
use crate::store::Store;

/// A catalog listing with the outcome of the inline action that preceded it, if any.
#[derive(Debug, Serialize)]
struct CatalogPage<T, O> {
    #[serde(flatten)]
    listing: CatalogListing<T, O>,
    #[serde(flatten)]
    outcome: Option<CatalogOutcome>,
    can_manage_catalog: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    areas: Option<Vec<Area>>,
}

fn render<T, O>(
    listing: CatalogListing<T, O>,
    outcome: Option<CatalogOutcome>,
    user: &CurrentUser,
    areas: Option<Vec<Area>>,
) -> Response
where
    T: Serialize,
    O: Serialize,
{
    Json(CatalogPage {
        listing,
        outcome,
        can_manage_catalog: user.capabilities.allows(Capability::ManageCatalog),
        areas,
    })
    .into_response()
}

/// Run an inline action. Without the catalog capability the body is never read.
async fn apply<S>(
    context: &AppContext<S>,
    user: &CurrentUser,
    kind: CatalogKind,
    form: Result<Form<CatalogForm>, ServiceError>,
) -> Result<CatalogOutcome, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::ManageCatalog) {
        return Ok(context.catalog.refuse(kind));
    }
    let Form(form) = form?;
    context
        .catalog
        .apply(kind, CatalogAction::from(form), true)
        .await
}

async fn area_choices<S>(context: &AppContext<S>) -> Result<Vec<Area>, ServiceError>
where
    S: Store + 'static,
{
    Ok(context.choices().await?.areas)
}

pub(crate) async fn areas_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let listing = context.listing.areas(&query).await?;
    Ok(render(listing, None, &user, None))
}

pub(crate) async fn areas_action<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<CatalogQuery>,
    form: Result<Form<CatalogForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let outcome = apply(&context, &user, CatalogKind::Area, form).await?;
    let listing = context.listing.areas(&query).await?;
    Ok(render(listing, Some(outcome), &user, None))
}

pub(crate) async fn departamentos_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let listing = context.listing.departamentos(&query).await?;
    let areas = area_choices(&context).await?;
    Ok(render(listing, None, &user, Some(areas)))
}

pub(crate) async fn departamentos_action<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<CatalogQuery>,
    form: Result<Form<CatalogForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let outcome = apply(&context, &user, CatalogKind::Departamento, form).await?;
    let listing = context.listing.departamentos(&query).await?;
    let areas = area_choices(&context).await?;
    Ok(render(listing, Some(outcome), &user, Some(areas)))
}

pub(crate) async fn cargos_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let listing = context.listing.cargos(&query).await?;
    Ok(render(listing, None, &user, None))
}

pub(crate) async fn cargos_action<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Query(query): Query<CatalogQuery>,
    form: Result<Form<CatalogForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    let outcome = apply(&context, &user, CatalogKind::Cargo, form).await?;
    let listing = context.listing.cargos(&query).await?;
    Ok(render(listing, Some(outcome), &user, None))
}

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::form::Form;
use super::session::{clear_session_cookie, session_cookie, session_token, CurrentUser};
use super::{AppContext, Choices};
use crate::access::Capability;
use crate::error::ServiceError;
use crate::identity::{
    CreateUserForm, Identity, LoginForm, PasswordChangeForm, Session, SignupForm,
};
use crate::listing::WorkerSummary;
use crate::store::Store;

const LOGIN_FAILED: &str = "Por favor, introduzca un nombre de usuario y clave correctos. \
                            Observe que ambos campos pueden ser sensibles a mayúsculas.";

#[derive(Debug, Serialize)]
pub(crate) struct FormPage {
    fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SignupPage {
    fields: &'static [&'static str],
    #[serde(flatten)]
    choices: Choices,
}

#[derive(Debug, Serialize)]
struct CreateUserPage {
    groups: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreatedUser {
    message: &'static str,
    message_type: &'static str,
    usuario: Identity,
    groups: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IdentityList {
    usuarios: Vec<Identity>,
    trabajadores: Vec<WorkerSummary>,
    can_create_users: bool,
}

fn with_session(session: &Session, target: &str) -> Response {
    ([(SET_COOKIE, session_cookie(session))], Redirect::to(target)).into_response()
}

pub(crate) async fn root(user: Option<CurrentUser>) -> Redirect {
    match user {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

pub(crate) async fn login_page() -> Json<serde_json::Value> {
    Json(json!({ "fields": ["username", "password"] }))
}

pub(crate) async fn login<S>(
    State(context): State<Arc<AppContext<S>>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    match context.identity.login(&form).await? {
        Some((_, session)) => Ok(with_session(&session, "/dashboard")),
        None => Err(ServiceError::field("__all__", LOGIN_FAILED)),
    }
}

pub(crate) async fn logout<S>(
    State(context): State<Arc<AppContext<S>>>,
    headers: HeaderMap,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if let Some(token) = session_token(&headers) {
        context.identity.logout(&token).await?;
    }
    Ok(([(SET_COOKIE, clear_session_cookie())], Redirect::to("/login")).into_response())
}

const SIGNUP_FIELDS: &[&str] = &[
    "username",
    "email",
    "password1",
    "password2",
    "nombres",
    "apellidos",
    "sexo",
    "rut",
    "fecha_ingreso",
    "area",
    "departamento",
    "cargo",
];

pub(crate) async fn signup_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: Option<CurrentUser>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let page = SignupPage {
        fields: SIGNUP_FIELDS,
        choices: context.choices().await?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn signup<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: Option<CurrentUser>,
    form: Result<Form<SignupForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let Form(form) = form?;
    let (identity, _) = context.identity.signup(form).await?;
    let session = context.identity.open_session(&identity).await?;
    Ok(with_session(&session, "/dashboard"))
}

pub(crate) async fn password_change_page(_user: CurrentUser) -> Json<FormPage> {
    Json(FormPage {
        fields: &["old_password", "new_password1", "new_password2"],
    })
}

pub(crate) async fn password_change<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Redirect, ServiceError>
where
    S: Store + 'static,
{
    context.identity.change_password(user.identity.id, form).await?;
    Ok(Redirect::to("/password-change/done"))
}

pub(crate) async fn password_change_done(_user: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "message": "Su contraseña ha sido cambiada." }))
}

pub(crate) async fn create_user_page<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::CreateIdentity) {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let page = CreateUserPage {
        groups: context.store.groups().await?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn create_user<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
    form: Result<Form<CreateUserForm>, ServiceError>,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::CreateIdentity) {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let Form(form) = form?;
    let usuario = context.identity.create_user(form).await?;
    let body = CreatedUser {
        message: "Usuario creado correctamente.",
        message_type: "success",
        usuario,
        groups: context.store.groups().await?,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn identity_list<S>(
    State(context): State<Arc<AppContext<S>>>,
    user: CurrentUser,
) -> Result<Response, ServiceError>
where
    S: Store + 'static,
{
    if !user.capabilities.allows(Capability::ViewIdentities) {
        return Ok(Redirect::to("/perfil").into_response());
    }
    let body = IdentityList {
        usuarios: context.listing.identities().await?,
        trabajadores: context.listing.worker_summaries().await?,
        can_create_users: user.capabilities.allows(Capability::CreateIdentity),
    };
    Ok(Json(body).into_response())
}

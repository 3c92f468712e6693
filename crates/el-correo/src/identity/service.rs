use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use chrono::Duration;

use super::domain::{Identity, IdentityId, NewIdentity};
use super::password::{hash_blocking, verify_blocking, PasswordError, PasswordHasher};
use super::session::{Session, Sessions, DEFAULT_SESSION_TTL_SECS};
use crate::access::TRABAJADOR;
use crate::error::ServiceError;
use crate::store::Store;
use crate::validation::{self, optional_id, FieldErrors};
use crate::workers::{
    service::resolve_placement, today, PersonalForm, Trabajador, WorkerDraft, SIGNUP_PLACEHOLDER,
};

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 8;

const USERNAME_TAKEN: &str = "Ya existe un usuario con este nombre.";
const EMAIL_TAKEN: &str = "Ya existe un usuario con este email.";
const INVALID_USERNAME: &str = "Introduzca un nombre de usuario válido. Este valor solo puede \
                                contener letras, números y los caracteres @/./+/-/_.";
const INVALID_EMAIL: &str = "Introduzca una dirección de correo electrónico válida.";
const PASSWORD_MISMATCH: &str = "Los dos campos de contraseña no coinciden.";
const PASSWORD_NUMERIC: &str = "Esta contraseña es completamente numérica.";
const WRONG_OLD_PASSWORD: &str =
    "Su contraseña antigua es incorrecta. Por favor, vuelva a introducirla.";

/// Account fields shared by signup and administrative user creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Public signup: an account plus the worker record it owns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    #[serde(flatten)]
    pub account: AccountForm,
    pub nombres: String,
    pub apellidos: String,
    pub sexo: String,
    pub rut: String,
    pub fecha_ingreso: Option<String>,
    #[serde(deserialize_with = "optional_id")]
    pub area: Option<i64>,
    #[serde(deserialize_with = "optional_id")]
    pub departamento: Option<i64>,
    #[serde(deserialize_with = "optional_id")]
    pub cargo: Option<i64>,
}

/// Administrative account creation with an optional existing group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserForm {
    #[serde(flatten)]
    pub account: AccountForm,
    pub group: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Check a new password pair and return the accepted password.
fn new_password(
    errors: &mut FieldErrors,
    first_field: &str,
    first: &str,
    second_field: &str,
    second: &str,
) -> String {
    if first.is_empty() {
        errors.add(first_field, validation::REQUIRED);
    }
    if second.is_empty() {
        errors.add(second_field, validation::REQUIRED);
        return String::new();
    }
    if first.is_empty() {
        return String::new();
    }
    if first != second {
        errors.add(second_field, PASSWORD_MISMATCH);
        return String::new();
    }
    if first.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            second_field,
            format!(
                "La contraseña es demasiado corta. Debe contener al menos {PASSWORD_MIN_LEN} caracteres."
            ),
        );
    }
    if first.chars().all(|c| c.is_ascii_digit()) {
        errors.add(second_field, PASSWORD_NUMERIC);
    }
    first.to_string()
}

/// Accounts, credentials, and login sessions.
pub struct IdentityService<S: ?Sized> {
    store: Arc<S>,
    hasher: Arc<PasswordHasher>,
    sessions: Sessions<S>,
}

impl<S> IdentityService<S>
where
    S: Store + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, hasher: Arc<PasswordHasher>) -> Self {
        Self::with_session_ttl(store, hasher, Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    pub fn with_session_ttl(store: Arc<S>, hasher: Arc<PasswordHasher>, ttl: Duration) -> Self {
        Self {
            sessions: Sessions::new(store.clone(), ttl),
            store,
            hasher,
        }
    }

    pub fn hasher(&self) -> &Arc<PasswordHasher> {
        &self.hasher
    }

    pub fn session_ttl(&self) -> Duration {
        self.sessions.ttl()
    }

    async fn validate_account(
        &self,
        form: &AccountForm,
        errors: &mut FieldErrors,
    ) -> Result<(String, String, String), ServiceError> {
        let username =
            validation::required(errors, "username", &form.username, USERNAME_MAX_LEN);
        if !username.is_empty() {
            if !valid_username(&username) {
                errors.add("username", INVALID_USERNAME);
            } else if self.store.identity_by_username(&username).await?.is_some() {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        let email = validation::required(errors, "email", &form.email, EMAIL_MAX_LEN);
        if !email.is_empty() {
            if !valid_email(&email) {
                errors.add("email", INVALID_EMAIL);
            } else if self.store.identity_by_email(&email).await?.is_some() {
                errors.add("email", EMAIL_TAKEN);
            }
        }

        let password = new_password(
            errors,
            "password1",
            &form.password1,
            "password2",
            &form.password2,
        );
        Ok((username, email, password))
    }

    async fn new_identity(
        &self,
        username: String,
        email: String,
        password: String,
        groups: BTreeSet<String>,
    ) -> Result<NewIdentity, ServiceError> {
        Ok(NewIdentity {
            username,
            email,
            password_hash: hash_blocking(self.hasher.clone(), password).await?,
            is_superuser: false,
            is_staff: false,
            groups,
            date_joined: today(),
        })
    }

    /// Public registration: the account joins the worker group and gets its worker record in
    /// the same write.
    pub async fn signup(&self, form: SignupForm) -> Result<(Identity, Trabajador), ServiceError> {
        let mut errors = FieldErrors::new();
        let (username, email, password) =
            self.validate_account(&form.account, &mut errors).await?;

        let personal = PersonalForm {
            nombres: form.nombres,
            apellidos: form.apellidos,
            sexo: form.sexo,
            rut: form.rut,
            fecha_ingreso: form.fecha_ingreso,
            ..PersonalForm::default()
        }
        .validate(&mut errors);
        let placement = resolve_placement(
            self.store.as_ref(),
            &mut errors,
            form.area,
            form.departamento,
            form.cargo,
        )
        .await?;

        if !errors.is_empty() {
            warn!(fields = %errors, "signup rejected");
            return Err(ServiceError::Validation(errors));
        }

        self.store.ensure_group(TRABAJADOR).await?;
        let identity = self
            .new_identity(
                username.clone(),
                email,
                password,
                BTreeSet::from([TRABAJADOR.to_string()]),
            )
            .await?;
        let worker = WorkerDraft {
            nombres: Some(personal.nombres),
            apellidos: Some(personal.apellidos),
            sexo: Some(personal.sexo),
            rut: personal.rut,
            fecha_ingreso: personal.fecha_ingreso,
            area_id: placement.area_id,
            departamento_id: placement.departamento_id,
            cargo_id: placement.cargo_id,
        }
        .with_fallbacks(&username, SIGNUP_PLACEHOLDER, today());

        let (identity, worker) = self
            .store
            .register_identity(identity, Some(worker))
            .await
            .map_err(|err| ServiceError::from_store(err, USERNAME_TAKEN))?;
        let worker = worker.ok_or_else(|| {
            ServiceError::NotFound(format!("worker for identity {}", identity.id.0))
        })?;

        info!(identity_id = identity.id.0, worker_id = worker.id.0, "account registered");
        Ok((identity, worker))
    }

    /// Administrative account creation. A group name is honoured only when that group exists.
    /// The account also receives a worker record so it can reach its profile.
    pub async fn create_user(&self, form: CreateUserForm) -> Result<Identity, ServiceError> {
        let mut errors = FieldErrors::new();
        let (username, email, password) =
            self.validate_account(&form.account, &mut errors).await?;
        if !errors.is_empty() {
            warn!(fields = %errors, "user creation rejected");
            return Err(ServiceError::Validation(errors));
        }

        let mut groups = BTreeSet::new();
        let group = form.group.trim();
        if !group.is_empty() {
            if self.store.group_exists(group).await? {
                groups.insert(group.to_string());
            } else {
                warn!(group, "ignoring unknown group on user creation");
            }
        }

        let identity = self
            .new_identity(username.clone(), email, password, groups)
            .await?;
        let worker =
            WorkerDraft::default().with_fallbacks(&username, SIGNUP_PLACEHOLDER, today());
        let (identity, _) = self
            .store
            .register_identity(identity, Some(worker))
            .await
            .map_err(|err| ServiceError::from_store(err, USERNAME_TAKEN))?;

        info!(identity_id = identity.id.0, username = %identity.username, "account created");
        Ok(identity)
    }

    /// Check credentials; `None` for an unknown user or a wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        let Some(identity) = self.store.identity_by_username(username.trim()).await? else {
            warn!(username, "login failed: unknown user");
            return Ok(None);
        };
        let verdict = verify_blocking(
            self.hasher.clone(),
            password.to_string(),
            identity.password_hash.clone(),
        )
        .await;
        match verdict {
            Ok(()) => Ok(Some(identity)),
            Err(PasswordError::Mismatch) => {
                warn!(identity_id = identity.id.0, "login failed: wrong password");
                Ok(None)
            }
            Err(err) => {
                warn!(identity_id = identity.id.0, error = %err, "login failed: unusable hash");
                Ok(None)
            }
        }
    }

    /// Authenticate and open a session; returns the session token.
    pub async fn login(
        &self,
        form: &LoginForm,
    ) -> Result<Option<(Identity, Session)>, ServiceError> {
        let Some(identity) = self.authenticate(&form.username, &form.password).await? else {
            return Ok(None);
        };
        let session = self.open_session(&identity).await?;
        Ok(Some((identity, session)))
    }

    /// Start a session for an account that was just verified or created.
    pub async fn open_session(&self, identity: &Identity) -> Result<Session, ServiceError> {
        let session = self.sessions.open(identity.id).await?;
        info!(
            identity_id = identity.id.0,
            expires_at = %session.expires_at,
            "session opened"
        );
        Ok(session)
    }

    pub async fn logout(&self, token: &str) -> Result<(), ServiceError> {
        if self.sessions.revoke(token).await? {
            info!("session closed");
        }
        Ok(())
    }

    /// Resolve a session token to a live account. Expired tokens and tokens of deleted accounts
    /// resolve to nobody.
    pub async fn current(&self, token: &str) -> Result<Option<Identity>, ServiceError> {
        let Some(identity_id) = self.sessions.resolve(token).await? else {
            return Ok(None);
        };
        Ok(self.store.fetch_identity(identity_id).await?)
    }

    pub async fn change_password(
        &self,
        identity_id: IdentityId,
        form: PasswordChangeForm,
    ) -> Result<(), ServiceError> {
        let mut identity = self
            .store
            .fetch_identity(identity_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("identity {}", identity_id.0)))?;

        let mut errors = FieldErrors::new();
        if form.old_password.is_empty() {
            errors.add("old_password", validation::REQUIRED);
        } else if verify_blocking(
            self.hasher.clone(),
            form.old_password.clone(),
            identity.password_hash.clone(),
        )
        .await
        .is_err()
        {
            errors.add("old_password", WRONG_OLD_PASSWORD);
        }
        let password = new_password(
            &mut errors,
            "new_password1",
            &form.new_password1,
            "new_password2",
            &form.new_password2,
        );
        if !errors.is_empty() {
            warn!(identity_id = identity_id.0, fields = %errors, "password change rejected");
            return Err(ServiceError::Validation(errors));
        }

        identity.password_hash = hash_blocking(self.hasher.clone(), password).await?;
        self.store.replace_identity(identity).await?;
        info!(identity_id = identity_id.0, "password changed");
        Ok(())
    }
}

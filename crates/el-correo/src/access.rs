//! Capability map derived from an account's superuser flag and group memberships.
//!
//! Computed once per request and handed to handlers, so group names never leak into request
//! handling.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::identity::{Identity, IdentityId};

pub const ADMINISTRADOR: &str = "Administrador";
pub const JEFE_RRHH: &str = "Jefe RR.HH.";
pub const TRABAJADOR: &str = "Trabajador";

/// Groups every deployment starts with.
pub const ROLE_GROUPS: [&str; 3] = [ADMINISTRADOR, JEFE_RRHH, TRABAJADOR];

/// A named permission checked at a page or write boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewIdentities,
    CreateIdentity,
    ViewWorkers,
    CreateWorker,
    EditProfile { owner: IdentityId },
    ManageCatalog,
}

/// The acting account as the policy sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: IdentityId,
    pub is_superuser: bool,
    pub groups: BTreeSet<String>,
}

impl From<&Identity> for Principal {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            is_superuser: identity.is_superuser,
            groups: identity.groups.clone(),
        }
    }
}

impl Principal {
    fn in_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }
}

/// Whether `principal` may exercise `capability`. Superusers may do everything.
pub fn allows(principal: &Principal, capability: Capability) -> bool {
    if principal.is_superuser {
        return true;
    }
    match capability {
        Capability::ViewIdentities | Capability::CreateIdentity | Capability::ManageCatalog => {
            principal.in_group(ADMINISTRADOR)
        }
        Capability::ViewWorkers | Capability::CreateWorker => {
            principal.in_group(ADMINISTRADOR) || principal.in_group(JEFE_RRHH)
        }
        Capability::EditProfile { owner } => principal.id == owner,
    }
}

/// Per-request capability flags, also rendered on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    #[serde(skip)]
    pub identity_id: IdentityId,
    #[serde(skip)]
    pub is_superuser: bool,
    pub can_view_users: bool,
    pub can_create_usuario: bool,
    pub can_view_trabajadores: bool,
    pub can_create_trabajador: bool,
    pub can_manage_catalog: bool,
}

impl Capabilities {
    pub fn resolve(principal: &Principal) -> Self {
        Self {
            identity_id: principal.id,
            is_superuser: principal.is_superuser,
            can_view_users: allows(principal, Capability::ViewIdentities),
            can_create_usuario: allows(principal, Capability::CreateIdentity),
            can_view_trabajadores: allows(principal, Capability::ViewWorkers),
            can_create_trabajador: allows(principal, Capability::CreateWorker),
            can_manage_catalog: allows(principal, Capability::ManageCatalog),
        }
    }

    pub fn of(identity: &Identity) -> Self {
        Self::resolve(&Principal::from(identity))
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewIdentities => self.can_view_users,
            Capability::CreateIdentity => self.can_create_usuario,
            Capability::ViewWorkers => self.can_view_trabajadores,
            Capability::CreateWorker => self.can_create_trabajador,
            Capability::ManageCatalog => self.can_manage_catalog,
            Capability::EditProfile { owner } => self.is_superuser || self.identity_id == owner,
        }
    }
}

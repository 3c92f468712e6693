use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub i64);

/// Authentication account a worker record hangs off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub groups: BTreeSet<String>,
    pub date_joined: NaiveDate,
}

impl Identity {
    pub fn in_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }
}

/// Values for an account that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub groups: BTreeSet<String>,
    pub date_joined: NaiveDate,
}

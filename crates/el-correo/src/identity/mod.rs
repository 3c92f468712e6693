//! Accounts, group membership, credentials, and login sessions.

mod domain;
pub mod password;
pub mod service;
pub mod session;

pub use domain::{Identity, IdentityId, NewIdentity};
pub use password::{hash_blocking, verify_blocking, PasswordConfig, PasswordError, PasswordHasher};
pub use service::{
    AccountForm, CreateUserForm, IdentityService, LoginForm, PasswordChangeForm, SignupForm,
};
pub use session::{Session, Sessions, DEFAULT_SESSION_TTL_SECS, SESSION_COOKIE};

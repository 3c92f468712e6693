use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::IdentityId;
use crate::store::{SessionRepository, StoreError};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sessionid";

/// Session lifetime when none is configured: two weeks.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 1_209_600;

/// Opaque 256-bit token, URL-safe base64 without padding.
pub fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// One persisted login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity_id: IdentityId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Opens, resolves, and revokes sessions kept in the store.
///
/// Expired rows are purged whenever a session is opened or an expired token is presented, so
/// the table never grows past the number of live logins plus the ones that lapsed since.
pub struct Sessions<S: ?Sized> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> Sessions<S>
where
    S: SessionRepository + ?Sized,
{
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn open(&self, identity_id: IdentityId) -> Result<Session, StoreError> {
        let now = Utc::now();
        let purged = self.store.purge_expired_sessions(now).await?;
        if purged > 0 {
            debug!(purged, "expired sessions purged");
        }
        let session = Session {
            token: generate_token(),
            identity_id,
            created_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.store.insert_session(session.clone()).await?;
        Ok(session)
    }

    /// The account behind a live token. An expired token is deleted on sight and resolves to
    /// nobody.
    pub async fn resolve(&self, token: &str) -> Result<Option<IdentityId>, StoreError> {
        let Some(session) = self.store.fetch_session(token).await? else {
            return Ok(None);
        };
        let now = Utc::now();
        if session.is_expired(now) {
            self.store.delete_session(token).await?;
            let purged = self.store.purge_expired_sessions(now).await?;
            debug!(
                identity_id = session.identity_id.0,
                purged,
                "expired session rejected"
            );
            return Ok(None);
        }
        Ok(Some(session.identity_id))
    }

    /// Returns whether the token was live.
    pub async fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        self.store.delete_session(token).await
    }

    pub async fn revoke_all(&self, identity_id: IdentityId) -> Result<usize, StoreError> {
        self.store.delete_sessions_for(identity_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::identity::NewIdentity;
    use crate::store::{IdentityRepository, MemoryStore};

    async fn store_with(usernames: &[&str]) -> (Arc<MemoryStore>, Vec<IdentityId>) {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for username in usernames {
            let identity = store
                .insert_identity(NewIdentity {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password_hash: String::new(),
                    is_superuser: false,
                    is_staff: false,
                    groups: BTreeSet::new(),
                    date_joined: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
                })
                .await
                .expect("identity");
            ids.push(identity.id);
        }
        (store, ids)
    }

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn revoked_tokens_stop_resolving() {
        let (store, ids) = store_with(&["ana"]).await;
        let sessions = Sessions::new(store, Duration::hours(1));
        let session = sessions.open(ids[0]).await.expect("open");
        assert!(session.expires_at > session.created_at);
        assert_eq!(
            sessions.resolve(&session.token).await.expect("resolve"),
            Some(ids[0])
        );

        assert!(sessions.revoke(&session.token).await.expect("revoke"));
        assert_eq!(sessions.resolve(&session.token).await.expect("resolve"), None);
        assert!(!sessions.revoke(&session.token).await.expect("second revoke"));
    }

    #[tokio::test]
    async fn revoke_all_only_touches_one_account() {
        let (store, ids) = store_with(&["uno", "dos"]).await;
        let sessions = Sessions::new(store, Duration::hours(1));
        sessions.open(ids[0]).await.expect("open");
        sessions.open(ids[0]).await.expect("open");
        let other = sessions.open(ids[1]).await.expect("open");

        assert_eq!(sessions.revoke_all(ids[0]).await.expect("revoke"), 2);
        assert_eq!(
            sessions.resolve(&other.token).await.expect("resolve"),
            Some(ids[1])
        );
    }

    #[tokio::test]
    async fn expired_tokens_resolve_to_nobody_and_are_purged() {
        let (store, ids) = store_with(&["ana", "leo"]).await;
        let lapsed = Sessions::new(store.clone(), Duration::zero());
        let first = lapsed.open(ids[0]).await.expect("open");
        let second = lapsed.open(ids[1]).await.expect("open");

        assert_eq!(lapsed.resolve(&first.token).await.expect("resolve"), None);
        assert_eq!(store.fetch_session(&first.token).await.expect("fetch"), None);
        assert_eq!(
            store.fetch_session(&second.token).await.expect("fetch"),
            None,
            "other expired rows go with it"
        );

        let live = Sessions::new(store.clone(), Duration::hours(1));
        let kept = live.open(ids[0]).await.expect("open");
        assert_eq!(live.resolve(&kept.token).await.expect("resolve"), Some(ids[0]));
    }

    #[tokio::test]
    async fn sessions_need_an_existing_account() {
        let (store, _) = store_with(&[]).await;
        let sessions = Sessions::new(store, Duration::hours(1));
        assert!(matches!(
            sessions.open(IdentityId(99)).await,
            Err(StoreError::ForeignKey { .. })
        ));
    }
}

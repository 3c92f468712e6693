use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};

use super::AppContext;
use crate::access::Capabilities;
use crate::identity::{Identity, Session, SESSION_COOKIE};
use crate::store::Store;

/// The authenticated account behind a request, with its capabilities resolved once.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub capabilities: Capabilities,
    pub token: String,
}

/// Session token from the `Cookie` headers, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Cookie for a freshly opened session; the browser drops it when the session lapses.
pub fn session_cookie(session: &Session) -> String {
    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    format!(
        "{SESSION_COOKIE}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}",
        session.token
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

#[async_trait]
impl<S> FromRequestParts<Arc<AppContext<S>>> for CurrentUser
where
    S: Store + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        context: &Arc<AppContext<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Err(Redirect::to("/login").into_response());
        };
        match context.identity.current(&token).await {
            Ok(Some(identity)) => Ok(Self {
                capabilities: Capabilities::of(&identity),
                identity,
                token,
            }),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(err) => Err(err.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            COOKIE,
            HeaderValue::from_static("csrftoken=abc; sessionid=tok-123; lang=es"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("tok-123"));
    }

    #[test]
    fn empty_session_cookie_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_carries_the_remaining_lifetime() {
        let created_at = chrono::Utc::now();
        let session = Session {
            token: "tok-123".to_string(),
            identity_id: crate::identity::IdentityId(1),
            created_at,
            expires_at: created_at + chrono::Duration::hours(2),
        };
        assert_eq!(
            session_cookie(&session),
            "sessionid=tok-123; HttpOnly; Path=/; SameSite=Lax; Max-Age=7200"
        );
    }
}

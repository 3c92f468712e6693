//! Form bodies accepted either as JSON or as urlencoded posts.
//!
//! A body that cannot be read or deserialized is answered like any other invalid form: 422
//! with the message under `errors.__all__`.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, Default)]
pub struct Form<T>(pub T);

fn is_urlencoded(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

fn rejected(detail: impl std::fmt::Display) -> ServiceError {
    debug!(%detail, "form body rejected");
    ServiceError::field("__all__", format!("Formulario inválido: {detail}"))
}

#[async_trait]
impl<T, S> FromRequest<S> for Form<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_urlencoded(&request) {
            let axum::Form(value) = axum::Form::<T>::from_request(request, state)
                .await
                .map_err(|rejection| rejected(rejection.body_text()))?;
            return Ok(Self(value));
        }

        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|rejection| rejected(rejection.body_text()))?;
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(rejected)
    }
}

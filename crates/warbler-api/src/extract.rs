use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

/// The `{id}` segment of a user or message route. A segment that isn't a
/// UUID can't name a row, so it gets the same 404 page as a missing one.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                debug!("Bad id in {}: {}", parts.uri.path(), rejection.body_text());
                Err(AppError::NotFound)
            }
        }
    }
}

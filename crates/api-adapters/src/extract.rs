//! Request extractors.
//!
//! `Json` and `Query` wrap the axum extractors so a malformed body or query
//! string turns into the standard 400 `{"error"}` shape instead of axum's
//! plain-text rejection. `CurrentUser`/`MaybeUser` read the signed session
//! cookie.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use domains::{Error, SessionUser};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

/// JSON body extractor with the API's 400 shape on rejection.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(ApiError(Error::Invalid(rejection.body_text()))),
        }
    }
}

/// Query-string extractor with the API's 400 shape on rejection.
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(ApiError(Error::Invalid(rejection.body_text()))),
        }
    }
}

/// The authenticated session user; rejects with 401 when there is none.
pub struct CurrentUser(pub SessionUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .map(CurrentUser)
            .ok_or(ApiError(Error::Unauthenticated))
    }
}

/// The session user when present. Anonymous requests read as `None`.
pub struct MaybeUser(pub Option<SessionUser>);

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state)))
    }
}

fn session_user(parts: &Parts, state: &Arc<AppState>) -> Option<SessionUser> {
    let header = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    state.sessions.user_from_cookie_header(header)
}

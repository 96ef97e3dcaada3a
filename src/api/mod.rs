use crate::core::session::SessionToken;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};

pub mod auth;
pub mod categories;
pub mod tickets;
pub mod users;

const BEARER: &str = "bearer ";

/// Session token of the caller, taken from `Authorization: Bearer <token>`.
///
/// The token is opaque; handlers resolve it into a session before doing
/// anything on the caller's behalf.
#[derive(Debug)]
pub struct ExtractToken(pub SessionToken);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Err((StatusCode::UNAUTHORIZED, "`Authorization` header is missing"));
        };
        let value = value
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, "invalid authorization header"))?
            .trim();

        // scheme is case-insensitive
        let token = match value.get(..BEARER.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(BEARER) => value[BEARER.len()..].trim(),
            _ => return Err((StatusCode::UNAUTHORIZED, "bearer token is missing")),
        };
        if token.is_empty() {
            return Err((StatusCode::UNAUTHORIZED, "bearer token is missing"));
        }

        Ok(ExtractToken(SessionToken::from(token)))
    }
}

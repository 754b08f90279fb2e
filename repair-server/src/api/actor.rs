//! Actor extraction
//!
//! Identity and role are resolved by the auth gateway in front of this
//! service and forwarded as headers. The engine trusts them as given.

use axum::extract::FromRequestParts;
use http::request::Parts;
use shared::order::{Actor, Role};

use crate::utils::{AppError, ErrorCode};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Actor of the current request
#[derive(Debug, Clone)]
pub struct ActorHeaders(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for ActorHeaders {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let (Some(id), Some(role)) = (
            header(parts, ACTOR_ID_HEADER),
            header(parts, ACTOR_ROLE_HEADER),
        ) else {
            tracing::warn!(uri = %parts.uri, "Request without actor headers");
            return Err(AppError::not_authenticated());
        };

        let role: Role = role.parse().map_err(|e: String| {
            AppError::with_message(ErrorCode::NotAuthenticated, e)
                .with_detail("header", ACTOR_ROLE_HEADER)
        })?;
        let name = header(parts, ACTOR_NAME_HEADER).unwrap_or(id);

        Ok(ActorHeaders(Actor::new(id, name, role)))
    }
}

use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use super::jwt::{SessionData, SessionKeys};
use crate::store::EntityStore;

#[derive(Debug)]
pub struct Unauthorized {
    pub info: &'static str,
}

impl reject::Reject for Unauthorized {}

fn unauthorized(info: &'static str) -> Rejection {
    reject::custom(Unauthorized { info })
}

/// Accepts `Token <jwt>` as well as `Bearer <jwt>`.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    match scheme.to_ascii_lowercase().as_str() {
        "token" | "bearer" => Some(token),
        _ => None,
    }
}

/// Resolves the `Authorization` header to the session of an existing, active user.
pub fn with_session(
    keys: Arc<SessionKeys>,
    store: Arc<dyn EntityStore>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        let store = store.clone();

        async move {
            let header = header
                .ok_or_else(|| unauthorized("Authentication credentials were not provided."))?;
            let token = parse_authorization(&header)
                .ok_or_else(|| unauthorized("Invalid token header."))?;

            let session = keys
                .verify_jwt_session(token)
                .map_err(|e| unauthorized(e.info()))?;

            match store.get_user_by_id(session.user_id).await {
                Ok(Some(user)) if user.is_active => Ok(SessionData::from(session)),
                Ok(_) => Err(unauthorized("User inactive or deleted.")),
                Err(e) => {
                    log::error!("> Failed to resolve session user: {e:?}");
                    Err(reject::custom(crate::rejection::ApiError::from(e)))
                }
            }
        }
    })
}

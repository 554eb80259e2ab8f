use std::{convert::Infallible, sync::Arc};

use warp::{Filter, Rejection, Reply};

use super::{attributes, recipes, rejection::handle_rejection};
use crate::{
    jwt::{SessionData, SessionKeys},
    schema::AttributeKind,
    media::MediaStorage,
    middleware::with_session,
    store::EntityStore,
};

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn EntityStore>,
    pub keys: Arc<SessionKeys>,
    pub media: MediaStorage,
    pub max_upload_bytes: u64,
}

impl Context {
    pub fn new(
        store: Arc<dyn EntityStore>,
        keys: SessionKeys,
        media: MediaStorage,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            keys: Arc::new(keys),
            media,
            max_upload_bytes,
        }
    }

    pub fn session(&self) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
        with_session(self.keys.clone(), self.store.clone())
    }
}

pub fn with_context(context: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// The complete HTTP surface: recipe, tag and ingredient endpoints plus uploaded media.
pub fn api(context: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = warp::path("media").and(warp::fs::dir(context.media.root().to_path_buf()));

    recipes::routes(context.clone())
        .or(attributes::routes(AttributeKind::Tag, context.clone()))
        .or(attributes::routes(AttributeKind::Ingredient, context))
        .or(media)
        .recover(handle_rejection)
        .with(warp::log("recipe_api::http"))
}

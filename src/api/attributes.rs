//! Tag and ingredient endpoints. Both kinds share one route tree mounted
//! under the kind's own path.

use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::{
    payload::AttributePayload,
    rejection::reject_with,
    routes::{with_context, Context},
    shape::{Action, AttributeShape},
};
use crate::{
    constants::MAX_JSON_BYTES,
    error::not_found,
    jwt::SessionData,
    query::{AttributeParams, AttributeQuery},
    schema::{AttributeKind, Id},
};

pub fn routes(
    kind: AttributeKind,
    context: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let session = context.session();
    let json_body = warp::body::content_length_limit(MAX_JSON_BYTES).and(warp::body::json());
    let collection = warp::path(kind.table()).and(warp::path::end());
    let member = warp::path(kind.table())
        .and(warp::path::param::<Id>())
        .and(warp::path::end());

    let list = collection
        .and(warp::get())
        .and(session.clone())
        .and(warp::query::<AttributeParams>())
        .and(with_context(context.clone()))
        .and_then(move |session: SessionData, params: AttributeParams, context: Context| {
            list_attributes(kind, session, params, context)
        });

    let update = member
        .clone()
        .and(warp::put())
        .and(session.clone())
        .and(json_body.clone())
        .and(with_context(context.clone()))
        .and_then(
            move |id: Id, session: SessionData, payload: AttributePayload, context: Context| {
                update_attribute(kind, Action::Update, id, session, payload, context)
            },
        );

    let partial_update = member
        .clone()
        .and(warp::patch())
        .and(session.clone())
        .and(json_body)
        .and(with_context(context.clone()))
        .and_then(
            move |id: Id, session: SessionData, payload: AttributePayload, context: Context| {
                update_attribute(kind, Action::PartialUpdate, id, session, payload, context)
            },
        );

    let destroy = member
        .and(warp::delete())
        .and(session)
        .and(with_context(context))
        .and_then(move |id: Id, session: SessionData, context: Context| {
            destroy_attribute(kind, id, session, context)
        });

    list.or(update).or(partial_update).or(destroy)
}

async fn list_attributes(
    kind: AttributeKind,
    session: SessionData,
    params: AttributeParams,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let query = AttributeQuery::from_params(kind, session.user_id, &params).map_err(reject_with)?;
    let shape = AttributeShape::for_action(Action::List);

    let page = context
        .store
        .fetch_attributes(&query)
        .await
        .map_err(reject_with)?
        .map(|attribute| shape.encode(&attribute));

    Ok(warp::reply::json(&page))
}

async fn update_attribute(
    kind: AttributeKind,
    action: Action,
    id: Id,
    session: SessionData,
    payload: AttributePayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let shape = AttributeShape::for_action(action);
    let name = payload
        .into_name(action == Action::PartialUpdate)
        .map_err(reject_with)?;

    let attribute = context
        .store
        .update_attribute(kind, session.user_id, id, name)
        .await
        .map_err(reject_with)?
        .ok_or_else(|| reject_with(not_found()))?;

    log::trace!("> Updated {} {id} of user {}", kind.label(), session.user_id);

    Ok(warp::reply::json(&shape.encode(&attribute)))
}

async fn destroy_attribute(
    kind: AttributeKind,
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let deleted = context
        .store
        .delete_attribute(kind, session.user_id, id)
        .await
        .map_err(reject_with)?;

    if !deleted {
        return Err(reject_with(not_found()));
    }

    Ok(warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT))
}

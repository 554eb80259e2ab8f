use bytes::BufMut;
use futures_util::TryStreamExt;
use warp::{
    http::StatusCode,
    multipart::{FormData, Part},
    Filter, Rejection, Reply,
};

use super::{
    payload::RecipePayload,
    rejection::reject_with,
    routes::{with_context, Context},
    shape::{Action, RecipeShape},
};
use crate::{
    constants::MAX_JSON_BYTES,
    error::{internal, not_found, ValidationErrors},
    jwt::SessionData,
    media::{image_extension, ImageFormat},
    query::{RecipeParams, RecipeQuery},
    schema::Id,
};

const NO_FILE: &str = "No file was submitted.";
const EMPTY_FILE: &str = "The submitted file is empty.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

pub fn routes(context: Context) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let session = context.session();
    let json_body = warp::body::content_length_limit(MAX_JSON_BYTES).and(warp::body::json());

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(session.clone())
        .and(warp::query::<RecipeParams>())
        .and(with_context(context.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(session.clone())
        .and(json_body.clone())
        .and(with_context(context.clone()))
        .and_then(create_recipe);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(with_context(context.clone()))
        .and_then(retrieve_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::put())
        .and(session.clone())
        .and(json_body.clone())
        .and(with_context(context.clone()))
        .and_then(update_recipe);

    let partial_update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(session.clone())
        .and(json_body)
        .and(with_context(context.clone()))
        .and_then(partial_update_recipe);

    let destroy = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(session.clone())
        .and(with_context(context.clone()))
        .and_then(destroy_recipe);

    let upload_image = warp::path!("recipes" / Id / "upload-image")
        .and(warp::post())
        .and(session)
        .and(image_form(context.max_upload_bytes))
        .and(with_context(context))
        .and_then(upload_recipe_image);

    list.or(create)
        .or(retrieve)
        .or(update)
        .or(partial_update)
        .or(destroy)
        .or(upload_image)
}

async fn list_recipes(
    session: SessionData,
    params: RecipeParams,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let query = RecipeQuery::from_params(session.user_id, &params).map_err(reject_with)?;
    let shape = RecipeShape::for_action(Action::List);

    let page = context
        .store
        .fetch_recipes(&query)
        .await
        .map_err(reject_with)?
        .map(|record| shape.encode(&record));

    Ok(warp::reply::json(&page))
}

async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let shape = RecipeShape::for_action(Action::Create);
    let recipe = payload.into_new().map_err(reject_with)?;

    // owner always comes from the session, never from the body
    let record = context
        .store
        .create_recipe(session.user_id, recipe)
        .await
        .map_err(reject_with)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&shape.encode(&record)),
        StatusCode::CREATED,
    ))
}

async fn retrieve_recipe(
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let shape = RecipeShape::for_action(Action::Retrieve);

    let record = context
        .store
        .get_recipe(session.user_id, id)
        .await
        .map_err(reject_with)?
        .ok_or_else(|| reject_with(not_found()))?;

    Ok(warp::reply::json(&shape.encode(&record)))
}

async fn apply_update(
    action: Action,
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    context: Context,
) -> Result<warp::reply::Json, Rejection> {
    let shape = RecipeShape::for_action(action);

    let existing = context
        .store
        .get_recipe(session.user_id, id)
        .await
        .map_err(reject_with)?;
    if existing.is_none() {
        return Err(reject_with(not_found()));
    }

    let changes = payload
        .into_changes(action == Action::PartialUpdate)
        .map_err(reject_with)?;

    let record = context
        .store
        .update_recipe(session.user_id, id, changes)
        .await
        .map_err(reject_with)?
        .ok_or_else(|| reject_with(not_found()))?;

    Ok(warp::reply::json(&shape.encode(&record)))
}

async fn update_recipe(
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    apply_update(Action::Update, id, session, payload, context).await
}

async fn partial_update_recipe(
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    context: Context,
) -> Result<impl Reply, Rejection> {
    apply_update(Action::PartialUpdate, id, session, payload, context).await
}

async fn destroy_recipe(
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let deleted = context
        .store
        .delete_recipe(session.user_id, id)
        .await
        .map_err(reject_with)?;

    if !deleted {
        return Err(reject_with(not_found()));
    }

    Ok(warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT))
}

/// Multipart form for multipart requests; `None` for any other body.
fn image_form(max_length: u64) -> impl Filter<Extract = (Option<FormData>,), Error = Rejection> + Clone {
    let other_body = warp::header::optional::<String>("content-type")
        .and_then(|content_type: Option<String>| async move {
            match content_type {
                Some(value) if value.to_ascii_lowercase().starts_with("multipart/form-data") => {
                    Err(warp::reject::not_found())
                }
                _ => Ok(()),
            }
        })
        .untuple_one()
        .map(|| None::<FormData>);

    let multipart = warp::multipart::form().max_length(max_length).map(Some);

    other_body.or(multipart).unify()
}

pub struct UploadedFile {
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

async fn read_image_part(form: FormData) -> Result<Option<UploadedFile>, warp::Error> {
    let parts: Vec<Part> = form.try_collect().await?;

    for part in parts {
        if part.name() != "image" {
            continue;
        }

        let filename = part.filename().map(str::to_owned);
        let data = part
            .stream()
            .try_fold(Vec::new(), |mut data, buf| async move {
                data.put(buf);
                Ok(data)
            })
            .await?;

        return Ok(Some(UploadedFile { filename, data }));
    }

    Ok(None)
}

/// Validates an upload against the image shape: the file must be present
/// and decode as a supported image. Returns the bytes and the extension to store.
pub fn validate_image(upload: Option<UploadedFile>) -> Result<(Vec<u8>, String), ValidationErrors> {
    let upload = upload.ok_or_else(|| ValidationErrors::field("image", NO_FILE))?;

    if upload.data.is_empty() {
        return Err(ValidationErrors::field("image", EMPTY_FILE));
    }

    let format =
        ImageFormat::verify(&upload.data).ok_or_else(|| ValidationErrors::field("image", INVALID_IMAGE))?;
    let extension = image_extension(format, upload.filename.as_deref());

    Ok((upload.data, extension))
}

async fn upload_recipe_image(
    id: Id,
    session: SessionData,
    form: Option<FormData>,
    context: Context,
) -> Result<impl Reply, Rejection> {
    let shape = RecipeShape::for_action(Action::UploadImage);

    let recipe = context
        .store
        .get_recipe(session.user_id, id)
        .await
        .map_err(reject_with)?;
    if recipe.is_none() {
        return Err(reject_with(not_found()));
    }

    let upload = match form {
        Some(form) => read_image_part(form).await.map_err(|e| {
            log::trace!("> Unreadable multipart body: {e}");
            reject_with(ValidationErrors::field(
                "image",
                "The submitted data was not a file. Check the encoding type on the form.",
            ))
        })?,
        None => None,
    };

    let validated = tokio::task::spawn_blocking(move || validate_image(upload))
        .await
        .map_err(|e| {
            log::error!("> Image validation for recipe {id} did not finish: {e}");
            reject_with(internal("Failed to validate image"))
        })?;

    let (data, extension) = match validated {
        Ok(image) => image,
        Err(errors) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&errors),
                StatusCode::BAD_REQUEST,
            ))
        }
    };

    let path = context
        .media
        .save_recipe_image(&data, &extension)
        .await
        .map_err(|e| {
            log::error!("> Failed to store image for recipe {id}: {e}");
            reject_with(internal("Failed to store image"))
        })?;

    let record = context
        .store
        .set_recipe_image(session.user_id, id, &path)
        .await
        .map_err(reject_with)?
        .ok_or_else(|| reject_with(not_found()))?;

    Ok(warp::reply::with_status(
        warp::reply::json(&shape.encode(&record)),
        StatusCode::OK,
    ))
}

use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{self, Reject},
    Rejection, Reply,
};

use crate::{error::ValidationErrors, middleware::Unauthorized};

/// Rejection carrying a store error or field-level validation errors out of a handler.
#[derive(Debug)]
pub enum ApiError {
    Request(potion::Error),
    Validation(ValidationErrors),
}

impl Reject for ApiError {}

impl From<potion::Error> for ApiError {
    fn from(value: potion::Error) -> Self {
        ApiError::Request(value)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        ApiError::Validation(value)
    }
}

pub fn reject_with<E: Into<ApiError>>(error: E) -> Rejection {
    reject::custom(error.into())
}

fn detail(info: &str) -> Value {
    json!({ "detail": info })
}

impl ApiError {
    fn render(&self) -> (StatusCode, Value) {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            ApiError::Request(error) => {
                let status = StatusCode::from_u16(error.code as u16)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let info = error.info.clone().unwrap_or_default();

                if status.is_server_error() {
                    log::error!("> Request failed: {info}");
                    (status, detail("A server error occurred."))
                } else {
                    (status, detail(&info))
                }
            }
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(error) = err.find::<ApiError>() {
        error.render()
    } else if let Some(error) = err.find::<Unauthorized>() {
        (StatusCode::UNAUTHORIZED, detail(error.info))
    } else if let Some(error) = err.find::<BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            detail(&format!("JSON parse error - {error}")),
        )
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            detail("Request body is too large."),
        )
    } else if err.find::<reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            detail("A Content-Length header is required."),
        )
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            detail("Unsupported media type in request."),
        )
    } else if err.find::<reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, detail("Invalid query string."))
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, detail("Not found."))
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            detail("Method not allowed."),
        )
    } else {
        log::error!("> Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            detail("A server error occurred."),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

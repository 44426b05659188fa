//! Shared JSON error envelope for the handful of HTTP endpoints this
//! crate exposes directly.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use std::fmt::Display;

pub type HttpResponse = Response;

#[derive(Debug, Clone, Serialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> HttpResponse {
    (status, Json(HttpErrorEnvelope { code: code.to_owned(), message: message.into() })).into_response()
}

pub fn internal_error(err: impl Display) -> HttpResponse {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", err.to_string())
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

pub mod auth;
pub mod error;
pub mod extract;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod session;
pub mod templates;
pub mod users;
pub mod views;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// `302 Found`, the redirect every form handler answers with.
pub fn found(location: impl AsRef<str>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.as_ref().to_string())]).into_response()
}

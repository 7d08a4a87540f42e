use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::templates::{ErrorTemplate, Layout};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Page not found"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "You can't do that"),
            Self::Template(_) | Self::Join(_) | Self::Internal(_) => {
                error!("Request failed: {}", self);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let page = ErrorTemplate {
            layout: Layout::default(),
            status: status.as_u16(),
            title,
        };
        match page.render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                error!("Failed to render error page: {}", e);
                status.into_response()
            }
        }
    }
}

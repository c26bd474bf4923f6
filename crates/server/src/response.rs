//! Error presentation shared by every handler.
//!
//! Handlers return their domain error; [`ErrorReply`] turns it into either the rendered
//! error page or a JSON body depending on [`PublicError::presentation`].

use crate::error::{Presentation, PublicError};
use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub site_name: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone)]
pub struct ErrorReply {
    pub status: StatusCode,
    pub message: &'static str,
    pub presentation: Presentation,
    pub site_name: String,
}

impl ErrorReply {
    pub fn from_error<E: PublicError>(err: &E, site_name: &str) -> Self {
        Self {
            status: err.status(),
            message: err.public_message(),
            presentation: err.presentation(),
            site_name: site_name.to_string(),
        }
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        match self.presentation {
            Presentation::Json => (
                self.status,
                Json(ErrorBody {
                    error: self.message.to_string(),
                }),
            )
                .into_response(),
            Presentation::Page => render_error_page(self.status, &self.site_name, self.message),
        }
    }
}

/// Render `error.html` with the given status.
pub fn render_error_page(status: StatusCode, site_name: &str, message: &str) -> Response {
    let template = ErrorTemplate { site_name, message };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Log a failed request and build its reply.
///
/// Server-side failures are logged at error level with their source, client mistakes
/// at warn. Neither reaches the client beyond the public message.
pub fn report<E: PublicError>(err: &E, site_name: &str) -> Response {
    if err.status().is_server_error() {
        let cause = std::error::Error::source(err).map(|source| source.to_string());
        tracing::error!(error = %err, cause = ?cause, "Request failed");
    } else {
        tracing::warn!(error = %err, "Request rejected");
    }
    ErrorReply::from_error(err, site_name).into_response()
}

//! Page-level error handling
//!
//! Every failure path ends in a rendered page or a redirect:
//! - `NotFound` covers missing records AND records the viewer may not see,
//!   so existence never leaks through a permission error,
//! - `LoginRequired` sends the browser to the credential form,
//! - anything else is logged and answered with a minimal 500 page.
//!
//! Ownership failures never reach this type; handlers turn them into
//! redirects to the entity's detail page directly.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

const NOT_FOUND_PAGE: &str = "<!doctype html>\n<html><head><title>Page not found</title></head>\
<body><h1>404 &mdash; Page not found</h1><p><a href=\"/\">Back to the front page</a></p></body></html>";

const SERVER_ERROR_PAGE: &str = "<!doctype html>\n<html><head><title>Server error</title></head>\
<body><h1>500 &mdash; Something went wrong</h1><p><a href=\"/\">Back to the front page</a></p></body></html>";

/// Error type for HTML page handlers
#[derive(Debug)]
pub enum PageError {
    /// Missing or not-visible record
    NotFound,
    /// Unauthenticated access to a protected operation; carries the
    /// path to come back to after login
    LoginRequired { next: String },
    /// Unexpected failure; logged, never shown to the client
    Internal(anyhow::Error),
}

impl PageError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// The login redirect target for a request to `next`
    pub fn login_redirect(next: &str) -> String {
        if next.is_empty() || next == "/" {
            "/auth/login/".to_string()
        } else {
            format!("/auth/login/?next={}", urlencoding::encode(next))
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::NotFound => {
                (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response()
            }
            PageError::LoginRequired { next } => {
                Redirect::to(&PageError::login_redirect(&next)).into_response()
            }
            PageError::Internal(err) => {
                tracing::error!("Unhandled page error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE)).into_response()
            }
        }
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<tera::Error> for PageError {
    fn from(err: tera::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

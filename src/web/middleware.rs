//! Web middleware and shared state
//!
//! Holds the application state, the session-cookie plumbing and the
//! authentication middleware. Authentication is optional on every route;
//! handlers that need a principal take `AuthenticatedUser` as an
//! extractor, whose rejection redirects to the login form.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::db::repositories::{
    CategoryRepository, LocationRepository, SqlxCategoryRepository, SqlxCommentRepository,
    SqlxLocationRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{CommentService, PostService, UserService};
use crate::web::error::PageError;
use crate::web::render::Templates;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Session cookie lifetime in seconds (kept in step with the service-side
/// session expiry of 7 days)
const SESSION_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_repo: Arc<dyn CategoryRepository>,
    pub location_repo: Arc<dyn LocationRepository>,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Wire repositories and services over a pool
    pub fn build(pool: DynDatabasePool, templates: Arc<Templates>) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let location_repo = SqlxLocationRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::new(user_repo.clone(), session_repo));
        let post_service = Arc::new(PostService::new(
            post_repo.clone(),
            category_repo.clone(),
            user_repo,
            comment_repo.clone(),
        ));
        let comment_service = Arc::new(CommentService::new(comment_repo, post_repo));

        Self {
            pool,
            user_service,
            post_service,
            comment_service,
            category_repo,
            location_repo,
            templates,
        }
    }
}

/// Authenticated user extracted from the request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Pull the session token out of the Cookie header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(token) = cookie.strip_prefix("session=") {
            return Some(token.to_string());
        }
    }
    None
}

/// Build the Set-Cookie header value for a fresh session
pub fn session_cookie(token: &str) -> HeaderValue {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_COOKIE_MAX_AGE
    );
    HeaderValue::from_str(&cookie).expect("session cookie is always valid ASCII")
}

/// Build the Set-Cookie header value that clears the session
pub fn clear_session_cookie() -> HeaderValue {
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    HeaderValue::from_str(&cookie).expect("session cookie is always valid ASCII")
}

/// Optional authentication middleware
///
/// Validates the session cookie when present and stores the user in the
/// request extensions. Never rejects; protected handlers enforce presence
/// through the `AuthenticatedUser` extractor.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        if let Ok(Some(user)) = state.user_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| PageError::LoginRequired {
                next: parts.uri.path().to_string(),
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

//! Authentication pages: login, logout, registration
//!
//! Successful login and registration set the HttpOnly session cookie and
//! redirect. Failed credentials re-render the form; they never error.

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::services::{LoginInput, RegisterInput, UserServiceError};
use crate::web::forms::{is_safe_next, LoginForm, RegisterForm};
use crate::web::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, AppState, AuthenticatedUser,
};
use crate::web::render::base_context;
use crate::web::PageError;

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

fn post_login_target(next: Option<&str>) -> &str {
    match next {
        Some(next) if is_safe_next(next) => next,
        _ => "/",
    }
}

fn login_page(
    state: &AppState,
    form: &LoginForm,
    errors: &[String],
) -> Result<Html<String>, PageError> {
    let mut ctx = base_context(None);
    ctx.insert("form", form);
    ctx.insert("errors", errors);

    Ok(Html(state.templates.render("registration/login.html", &ctx)?))
}

fn registration_page(
    state: &AppState,
    form: &RegisterForm,
    errors: &[String],
) -> Result<Html<String>, PageError> {
    let mut ctx = base_context(None);
    ctx.insert("form", form);
    ctx.insert("errors", errors);

    Ok(Html(
        state
            .templates
            .render("registration/registration_form.html", &ctx)?,
    ))
}

/// Set-cookie + redirect response used by login and registration
fn signed_in_response(token: &str, target: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(token));
    (headers, Redirect::to(target)).into_response()
}

/// GET /auth/login/
pub async fn login_form(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<NextQuery>,
) -> Result<Response, PageError> {
    // Already signed in: nothing to collect
    if user.is_some() {
        return Ok(Redirect::to(post_login_target(query.next.as_deref())).into_response());
    }

    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    Ok(login_page(&state, &form, &[])?.into_response())
}

/// POST /auth/login/
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let input = LoginInput::new(form.username.clone(), form.password.clone());

    match state.user_service.login(input).await {
        Ok(session) => {
            let target = post_login_target(form.next.as_deref());
            Ok(signed_in_response(&session.id, target))
        }
        Err(UserServiceError::AuthenticationError(msg)) => {
            let form = LoginForm {
                password: String::new(),
                ..form
            };
            Ok(login_page(&state, &form, &[msg])?.into_response())
        }
        Err(err) => Err(PageError::internal(err)),
    }
}

/// POST /auth/logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    if let Some(token) = extract_session_token(&headers) {
        state
            .user_service
            .logout(&token)
            .await
            .map_err(PageError::internal)?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, clear_session_cookie());
    Ok((response_headers, Redirect::to("/")).into_response())
}

/// GET /auth/registration/
pub async fn register_form(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    registration_page(&state, &RegisterForm::default(), &[])
}

/// POST /auth/registration/ — signs the new user in right away
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    if form.password1 != form.password2 {
        return Ok(
            registration_page(&state, &form, &["Passwords do not match".to_string()])?
                .into_response(),
        );
    }

    let input = RegisterInput::new(
        form.username.clone(),
        form.email.clone(),
        form.password1.clone(),
    );

    let user = match state.user_service.register(input).await {
        Ok(user) => user,
        Err(UserServiceError::ValidationError(msg)) | Err(UserServiceError::UserExists(msg)) => {
            return Ok(registration_page(&state, &form, &[msg])?.into_response())
        }
        Err(err) => return Err(PageError::internal(err)),
    };

    let session = state
        .user_service
        .login(LoginInput::new(user.username, form.password1))
        .await
        .map_err(PageError::internal)?;

    Ok(signed_in_response(&session.id, "/"))
}

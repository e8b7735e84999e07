//! Profile pages: a user's posts, and editing one's own profile
//!
//! Profile editing always targets the session user; the route carries no
//! identifier at all.

use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::models::User;
use crate::services::{PostServiceError, UserServiceError};
use crate::web::forms::ProfileForm;
use crate::web::middleware::{AppState, AuthenticatedUser};
use crate::web::render::base_context;
use crate::web::{insert_page, PageError, PageQuery};

/// GET /profile/{username}/ — the profile and its posts
///
/// The owner sees all of their posts, drafts included; everyone else only
/// the publicly visible subset.
pub async fn detail(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let viewer = user.as_ref().map(|u| u.0.id);
    let (profile, page) = state
        .post_service
        .profile_page(&username, viewer, query.page)
        .await
        .map_err(|err| match err {
            PostServiceError::NotFound => PageError::NotFound,
            other => PageError::internal(other),
        })?;

    let mut ctx = base_context(user.as_ref().map(|u| &u.0));
    ctx.insert("profile", &profile);
    ctx.insert("is_owner", &(viewer == Some(profile.id)));
    insert_page(&mut ctx, &page);

    Ok(Html(state.templates.render("blog/profile.html", &ctx)?))
}

fn render_profile_form(
    state: &AppState,
    user: &User,
    form: &ProfileForm,
    errors: &[String],
) -> Result<Html<String>, PageError> {
    let mut ctx = base_context(Some(user));
    ctx.insert("form", form);
    ctx.insert("errors", errors);

    Ok(Html(state.templates.render("blog/user.html", &ctx)?))
}

/// GET /edit_profile/
pub async fn edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Html<String>, PageError> {
    let form = ProfileForm {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
    };
    render_profile_form(&state, &user, &form, &[])
}

/// POST /edit_profile/ — success redirects to the front page
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response, PageError> {
    match state.user_service.update_profile(&user, form.to_input()).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(UserServiceError::ValidationError(msg)) | Err(UserServiceError::UserExists(msg)) => {
            Ok(render_profile_form(&state, &user, &form, &[msg])?.into_response())
        }
        Err(err) => Err(PageError::internal(err)),
    }
}

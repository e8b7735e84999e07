//! Comment pages: add, edit, delete
//!
//! All three redirect to the post's detail page on success, and a
//! non-author touching someone else's comment is redirected there too.

use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::models::Comment;
use crate::services::{CommentServiceError, PostServiceError};
use crate::web::forms::CommentForm;
use crate::web::middleware::{AppState, AuthenticatedUser};
use crate::web::render::base_context;
use crate::web::PageError;

fn comment_err(err: CommentServiceError) -> PageError {
    match err {
        CommentServiceError::NotFound => PageError::NotFound,
        other => PageError::internal(other),
    }
}

fn detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// Render the standalone comment form page
fn render_comment_form(
    state: &AppState,
    user: &crate::models::User,
    post_id: i64,
    comment: Option<&Comment>,
    form: &CommentForm,
    action: &str,
    deleting: bool,
    errors: &[String],
) -> Result<Html<String>, PageError> {
    let mut ctx = base_context(Some(user));
    ctx.insert("post_id", &post_id);
    ctx.insert("form", form);
    ctx.insert("form_action", action);
    ctx.insert("deleting", &deleting);
    ctx.insert("errors", errors);
    if let Some(comment) = comment {
        ctx.insert("comment", comment);
    }

    Ok(Html(state.templates.render("blog/comment.html", &ctx)?))
}

/// GET /posts/{post_id}/add_comment/
pub async fn create_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<Html<String>, PageError> {
    // Resolve the post under the same rules as the detail page
    state
        .post_service
        .detail(post_id, Some(user.id))
        .await
        .map_err(|err| match err {
            PostServiceError::NotFound => PageError::NotFound,
            other => PageError::internal(other),
        })?;

    let action = format!("/posts/{}/add_comment/", post_id);
    render_comment_form(
        &state,
        &user,
        post_id,
        None,
        &CommentForm::default(),
        &action,
        false,
        &[],
    )
}

/// POST /posts/{post_id}/add_comment/
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    match state.comment_service.add(post_id, user.id, &form.text).await {
        Ok(_) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(CommentServiceError::ValidationError(msg)) => {
            let action = format!("/posts/{}/add_comment/", post_id);
            Ok(
                render_comment_form(&state, &user, post_id, None, &form, &action, false, &[msg])?
                    .into_response(),
            )
        }
        Err(err) => Err(comment_err(err)),
    }
}

/// GET /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    match state
        .comment_service
        .get_owned(post_id, comment_id, user.id)
        .await
    {
        Ok(comment) => {
            let form = CommentForm {
                text: comment.text.clone(),
            };
            let action = format!("/posts/{}/edit_comment/{}/", post_id, comment_id);
            Ok(render_comment_form(
                &state,
                &user,
                post_id,
                Some(&comment),
                &form,
                &action,
                false,
                &[],
            )?
            .into_response())
        }
        Err(CommentServiceError::NotOwner) => {
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        Err(err) => Err(comment_err(err)),
    }
}

/// POST /posts/{post_id}/edit_comment/{comment_id}/
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    match state
        .comment_service
        .update(post_id, comment_id, user.id, &form.text)
        .await
    {
        Ok(_) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(CommentServiceError::NotOwner) => {
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        Err(CommentServiceError::ValidationError(msg)) => {
            let action = format!("/posts/{}/edit_comment/{}/", post_id, comment_id);
            Ok(
                render_comment_form(&state, &user, post_id, None, &form, &action, false, &[msg])?
                    .into_response(),
            )
        }
        Err(err) => Err(comment_err(err)),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id}/ — confirmation page
pub async fn delete_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    match state
        .comment_service
        .get_owned(post_id, comment_id, user.id)
        .await
    {
        Ok(comment) => {
            let form = CommentForm {
                text: comment.text.clone(),
            };
            let action = format!("/posts/{}/delete_comment/{}/", post_id, comment_id);
            Ok(render_comment_form(
                &state,
                &user,
                post_id,
                Some(&comment),
                &form,
                &action,
                true,
                &[],
            )?
            .into_response())
        }
        Err(CommentServiceError::NotOwner) => {
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        Err(err) => Err(comment_err(err)),
    }
}

/// POST /posts/{post_id}/delete_comment/{comment_id}/
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    match state
        .comment_service
        .delete(post_id, comment_id, user.id)
        .await
    {
        Ok(()) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(CommentServiceError::NotOwner) => {
            Ok(Redirect::to(&detail_url(post_id)).into_response())
        }
        Err(err) => Err(comment_err(err)),
    }
}

//! Post pages: front page, detail, create, edit, delete
//!
//! Ownership failures on edit/delete redirect to the post's detail page
//! rather than erroring; unresolvable posts are a plain 404.

use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::models::User;
use crate::services::PostServiceError;
use crate::web::forms::{CommentForm, PostForm};
use crate::web::middleware::{AppState, AuthenticatedUser};
use crate::web::render::base_context;
use crate::web::{insert_page, PageError, PageQuery};

/// Map service errors that carry no redirect target
fn post_err(err: PostServiceError) -> PageError {
    match err {
        PostServiceError::NotFound => PageError::NotFound,
        other => PageError::internal(other),
    }
}

fn detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// GET / — the public feed
pub async fn index(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let page = state
        .post_service
        .front_page(query.page)
        .await
        .map_err(post_err)?;

    let mut ctx = base_context(user.as_ref().map(|u| &u.0));
    insert_page(&mut ctx, &page);

    Ok(Html(state.templates.render("blog/index.html", &ctx)?))
}

/// GET /posts/{post_id}/ — post detail with comments and a comment form
pub async fn detail(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(post_id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let viewer = user.as_ref().map(|u| u.0.id);
    let (entry, comments) = state
        .post_service
        .detail(post_id, viewer)
        .await
        .map_err(post_err)?;

    let mut ctx = base_context(user.as_ref().map(|u| &u.0));
    ctx.insert("post", &entry);
    ctx.insert("comments", &comments);
    ctx.insert("is_author", &(viewer == Some(entry.post.author_id)));
    ctx.insert("form", &CommentForm::default());

    Ok(Html(state.templates.render("blog/detail.html", &ctx)?))
}

/// Render the post form page (create, edit and delete-confirm share it)
async fn render_post_form(
    state: &AppState,
    user: &User,
    form: &PostForm,
    action: &str,
    deleting: bool,
    errors: &[String],
) -> Result<Html<String>, PageError> {
    let categories = state.category_repo.list_published().await?;
    let locations = state.location_repo.list_published().await?;

    let mut ctx = base_context(Some(user));
    ctx.insert("form", form);
    ctx.insert("form_action", action);
    ctx.insert("deleting", &deleting);
    ctx.insert("errors", errors);
    ctx.insert("categories", &categories);
    ctx.insert("locations", &locations);

    Ok(Html(state.templates.render("blog/create.html", &ctx)?))
}

/// GET /posts/create/
pub async fn create_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Html<String>, PageError> {
    let form = PostForm {
        is_published: Some("on".to_string()),
        ..Default::default()
    };
    render_post_form(&state, &user, &form, "/posts/create/", false, &[]).await
}

/// POST /posts/create/
///
/// The author is the session user; the submission cannot say otherwise.
/// Success redirects to the author's profile.
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Form(form): Form<PostForm>,
) -> Result<Response, PageError> {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(msg) => {
            return Ok(
                render_post_form(&state, &user, &form, "/posts/create/", false, &[msg])
                    .await?
                    .into_response(),
            )
        }
    };

    match state.post_service.create(&user, input).await {
        Ok(_) => Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response()),
        Err(PostServiceError::ValidationError(msg)) => Ok(render_post_form(
            &state,
            &user,
            &form,
            "/posts/create/",
            false,
            &[msg],
        )
        .await?
        .into_response()),
        Err(err) => Err(post_err(err)),
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<Response, PageError> {
    match state.post_service.get_owned(post_id, user.id).await {
        Ok(post) => {
            let form = PostForm::from_post(&post);
            let action = format!("/posts/{}/edit/", post_id);
            Ok(render_post_form(&state, &user, &form, &action, false, &[])
                .await?
                .into_response())
        }
        Err(PostServiceError::NotOwner) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(err) => Err(post_err(err)),
    }
}

/// POST /posts/{post_id}/edit/
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, PageError> {
    let action = format!("/posts/{}/edit/", post_id);

    let input = match form.to_input() {
        Ok(input) => input,
        Err(msg) => {
            return Ok(render_post_form(&state, &user, &form, &action, false, &[msg])
                .await?
                .into_response())
        }
    };

    match state.post_service.update(post_id, user.id, input).await {
        Ok(_) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(PostServiceError::NotOwner) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(PostServiceError::ValidationError(msg)) => {
            Ok(render_post_form(&state, &user, &form, &action, false, &[msg])
                .await?
                .into_response())
        }
        Err(err) => Err(post_err(err)),
    }
}

/// GET /posts/{post_id}/delete/ — confirmation page
pub async fn delete_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<Response, PageError> {
    match state.post_service.get_owned(post_id, user.id).await {
        Ok(post) => {
            let form = PostForm::from_post(&post);
            let action = format!("/posts/{}/delete/", post_id);
            Ok(render_post_form(&state, &user, &form, &action, true, &[])
                .await?
                .into_response())
        }
        Err(PostServiceError::NotOwner) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(err) => Err(post_err(err)),
    }
}

/// POST /posts/{post_id}/delete/ — success redirects to the front page
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<Response, PageError> {
    match state.post_service.delete(post_id, user.id).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(PostServiceError::NotOwner) => Ok(Redirect::to(&detail_url(post_id)).into_response()),
        Err(err) => Err(post_err(err)),
    }
}

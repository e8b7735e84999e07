//! Category listing page

use axum::{
    extract::{Path, Query, State},
    response::Html,
};

use crate::services::PostServiceError;
use crate::web::middleware::{AppState, AuthenticatedUser};
use crate::web::render::base_context;
use crate::web::{insert_page, PageError, PageQuery};

/// GET /category/{slug}/ — a published category's visible posts
///
/// Missing and unpublished categories are both a 404.
pub async fn detail(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let (category, page) = state
        .post_service
        .category_page(&slug, query.page)
        .await
        .map_err(|err| match err {
            PostServiceError::NotFound => PageError::NotFound,
            other => PageError::internal(other),
        })?;

    let mut ctx = base_context(user.as_ref().map(|u| &u.0));
    ctx.insert("category", &category);
    insert_page(&mut ctx, &page);

    Ok(Html(state.templates.render("blog/category.html", &ctx)?))
}

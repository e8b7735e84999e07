//! Post service
//!
//! Owns the rules around posts:
//! - the public-visibility invariant (published, category published or
//!   absent, publication date not in the future),
//! - detail resolution that never distinguishes "hidden" from "missing",
//! - author-only mutation, surfaced as `NotOwner` so the web layer can
//!   redirect instead of erroring,
//! - author stamping on create.

use crate::db::repositories::{
    CategoryRepository, CommentRepository, PostRepository, UserRepository,
};
use crate::models::{
    Category, CommentView, FeedEntry, ListParams, PagedResult, Post, PostInput, User,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// The post (or category/profile) does not exist or may not be seen
    #[error("Not found")]
    NotFound,

    /// The acting principal is not the post's author
    #[error("Not the author")]
    NotOwner,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    users: Arc<dyn UserRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        users: Arc<dyn UserRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            posts,
            categories,
            users,
            comments,
        }
    }

    /// The home listing: publicly visible posts, newest first
    pub async fn front_page(&self, page: u32) -> Result<PagedResult<FeedEntry>, PostServiceError> {
        let now = Utc::now();
        let params = ListParams::for_page(page);

        let items = self
            .posts
            .list_visible(now, params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        let total = self
            .posts
            .count_visible(now)
            .await
            .context("Failed to count posts")?;

        Ok(PagedResult::new(items, total, &params))
    }

    /// A category's listing. Missing and unpublished categories both
    /// resolve to `NotFound`.
    pub async fn category_page(
        &self,
        slug: &str,
        page: u32,
    ) -> Result<(Category, PagedResult<FeedEntry>), PostServiceError> {
        let category = self
            .categories
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .ok_or(PostServiceError::NotFound)?;

        if !category.is_published {
            return Err(PostServiceError::NotFound);
        }

        let now = Utc::now();
        let params = ListParams::for_page(page);

        let items = self
            .posts
            .list_visible_by_category(category.id, now, params.offset(), params.limit())
            .await
            .context("Failed to list posts by category")?;
        let total = self
            .posts
            .count_visible_by_category(category.id, now)
            .await
            .context("Failed to count posts by category")?;

        Ok((category, PagedResult::new(items, total, &params)))
    }

    /// A profile's listing. The owner sees all of their posts, everyone
    /// else only the publicly visible subset.
    pub async fn profile_page(
        &self,
        username: &str,
        viewer_id: Option<i64>,
        page: u32,
    ) -> Result<(User, PagedResult<FeedEntry>), PostServiceError> {
        let profile = self
            .users
            .get_by_username(username)
            .await
            .context("Failed to get user")?
            .ok_or(PostServiceError::NotFound)?;

        let params = ListParams::for_page(page);

        let (items, total) = if viewer_id == Some(profile.id) {
            let items = self
                .posts
                .list_by_author(profile.id, params.offset(), params.limit())
                .await
                .context("Failed to list posts by author")?;
            let total = self
                .posts
                .count_by_author(profile.id)
                .await
                .context("Failed to count posts by author")?;
            (items, total)
        } else {
            let now = Utc::now();
            let items = self
                .posts
                .list_visible_by_author(profile.id, now, params.offset(), params.limit())
                .await
                .context("Failed to list visible posts by author")?;
            let total = self
                .posts
                .count_visible_by_author(profile.id, now)
                .await
                .context("Failed to count visible posts by author")?;
            (items, total)
        };

        Ok((profile, PagedResult::new(items, total, &params)))
    }

    /// Resolve a post for its detail page.
    ///
    /// Resolvable iff the viewer is the author OR the post is publicly
    /// visible; everything else is `NotFound`, so existence never leaks.
    /// Comments come back author-joined in creation order.
    pub async fn detail(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<(FeedEntry, Vec<CommentView>), PostServiceError> {
        let entry = self
            .posts
            .get_entry(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if viewer_id != Some(entry.post.author_id) {
            let category_published = match entry.post.category_id {
                Some(category_id) => self
                    .categories
                    .get_by_id(category_id)
                    .await
                    .context("Failed to get category")?
                    .map(|c| c.is_published),
                None => None,
            };

            if !entry.post.is_visible_at(category_published, Utc::now()) {
                return Err(PostServiceError::NotFound);
            }
        }

        let comments = self
            .comments
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?;

        Ok((entry, comments))
    }

    /// Create a post authored by `author`. Whatever the submission claims
    /// about authorship is irrelevant; `PostInput` cannot even carry it.
    pub async fn create(
        &self,
        author: &User,
        input: PostInput,
    ) -> Result<Post, PostServiceError> {
        validate_post_input(&input)?;

        let post = self
            .posts
            .create(&input, author.id)
            .await
            .context("Failed to create post")?;

        Ok(post)
    }

    /// Fetch a post for editing. `NotOwner` for anyone but the author;
    /// the author gets their post regardless of publish flags.
    pub async fn get_owned(&self, post_id: i64, actor_id: i64) -> Result<Post, PostServiceError> {
        let post = self
            .posts
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if post.author_id != actor_id {
            return Err(PostServiceError::NotOwner);
        }

        Ok(post)
    }

    /// Update a post, author only
    pub async fn update(
        &self,
        post_id: i64,
        actor_id: i64,
        input: PostInput,
    ) -> Result<Post, PostServiceError> {
        self.get_owned(post_id, actor_id).await?;
        validate_post_input(&input)?;

        let updated = self
            .posts
            .update(post_id, &input)
            .await
            .context("Failed to update post")?;

        Ok(updated)
    }

    /// Delete a post, author only
    pub async fn delete(&self, post_id: i64, actor_id: i64) -> Result<(), PostServiceError> {
        self.get_owned(post_id, actor_id).await?;

        self.posts
            .delete(post_id)
            .await
            .context("Failed to delete post")?;

        Ok(())
    }
}

fn validate_post_input(input: &PostInput) -> Result<(), PostServiceError> {
    if input.title.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title cannot be empty".to_string(),
        ));
    }
    if input.text.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

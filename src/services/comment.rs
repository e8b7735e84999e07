//! Comment service
//!
//! Comments hang off posts and follow the same ownership rule as posts:
//! only the author mutates, everyone else is bounced back to the post's
//! detail page by the web layer.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, NewComment};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// The post or comment does not exist (or they don't belong together)
    #[error("Not found")]
    NotFound,

    /// The acting principal is not the comment's author
    #[error("Not the author")]
    NotOwner,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Add a comment to a post. Post and author are stamped server-side;
    /// the submission only carries the text.
    pub async fn add(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        validate_text(text)?;

        // The post must exist; visibility is not checked here, matching
        // the detail page being the only way to reach the form
        self.posts
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(CommentServiceError::NotFound)?;

        let comment = self
            .comments
            .create(&NewComment {
                text: text.to_string(),
                post_id,
                author_id,
            })
            .await
            .context("Failed to create comment")?;

        Ok(comment)
    }

    /// Fetch a comment for editing. The comment must belong to the given
    /// post, and the actor must be its author.
    pub async fn get_owned(
        &self,
        post_id: i64,
        comment_id: i64,
        actor_id: i64,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self
            .comments
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .ok_or(CommentServiceError::NotFound)?;

        if comment.post_id != post_id {
            return Err(CommentServiceError::NotFound);
        }

        if comment.author_id != actor_id {
            return Err(CommentServiceError::NotOwner);
        }

        Ok(comment)
    }

    /// Update a comment's text, author only
    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        actor_id: i64,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        self.get_owned(post_id, comment_id, actor_id).await?;
        validate_text(text)?;

        let updated = self
            .comments
            .update_text(comment_id, text)
            .await
            .context("Failed to update comment")?;

        Ok(updated)
    }

    /// Delete a comment, author only
    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        actor_id: i64,
    ) -> Result<(), CommentServiceError> {
        self.get_owned(post_id, comment_id, actor_id).await?;

        self.comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;

        Ok(())
    }
}

fn validate_text(text: &str) -> Result<(), CommentServiceError> {
    if text.trim().is_empty() {
        return Err(CommentServiceError::ValidationError(
            "Comment text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        PostRepository, SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{PostInput, User};

    struct Fixture {
        service: CommentService,
        author_id: i64,
        other_id: i64,
        post_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::new(pool.clone());
        let author = user_repo
            .create(&User::new("author", "a@example.com", "hash"))
            .await
            .expect("Failed to create user");
        let other = user_repo
            .create(&User::new("other", "o@example.com", "hash"))
            .await
            .expect("Failed to create user");

        let posts = Arc::new(SqlxPostRepository::new(pool.clone()));
        let post = posts
            .create(&PostInput::new("A post", "body"), author.id)
            .await
            .expect("Failed to create post");

        let comments = Arc::new(SqlxCommentRepository::new(pool));

        Fixture {
            service: CommentService::new(comments, posts),
            author_id: author.id,
            other_id: other.id,
            post_id: post.id,
        }
    }

    #[tokio::test]
    async fn test_add_comment() {
        let fx = setup().await;

        let comment = fx
            .service
            .add(fx.post_id, fx.other_id, "Nice post")
            .await
            .expect("Add failed");

        assert_eq!(comment.post_id, fx.post_id);
        assert_eq!(comment.author_id, fx.other_id);
        assert_eq!(comment.text, "Nice post");
    }

    #[tokio::test]
    async fn test_add_to_missing_post_is_not_found() {
        let fx = setup().await;

        let result = fx.service.add(9999, fx.other_id, "hello").await;
        assert!(matches!(result, Err(CommentServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_add_empty_text_is_rejected() {
        let fx = setup().await;

        let result = fx.service.add(fx.post_id, fx.other_id, "   ").await;
        assert!(matches!(
            result,
            Err(CommentServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_author_only() {
        let fx = setup().await;

        let comment = fx
            .service
            .add(fx.post_id, fx.author_id, "original")
            .await
            .expect("Add failed");

        let result = fx
            .service
            .update(fx.post_id, comment.id, fx.other_id, "hijack")
            .await;
        assert!(matches!(result, Err(CommentServiceError::NotOwner)));

        let updated = fx
            .service
            .update(fx.post_id, comment.id, fx.author_id, "edited")
            .await
            .expect("Update failed");
        assert_eq!(updated.text, "edited");
    }

    #[tokio::test]
    async fn test_delete_is_author_only() {
        let fx = setup().await;

        let comment = fx
            .service
            .add(fx.post_id, fx.author_id, "delete me")
            .await
            .expect("Add failed");

        let result = fx
            .service
            .delete(fx.post_id, comment.id, fx.other_id)
            .await;
        assert!(matches!(result, Err(CommentServiceError::NotOwner)));

        fx.service
            .delete(fx.post_id, comment.id, fx.author_id)
            .await
            .expect("Delete failed");

        let result = fx
            .service
            .get_owned(fx.post_id, comment.id, fx.author_id)
            .await;
        assert!(matches!(result, Err(CommentServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_comment_must_belong_to_post() {
        let fx = setup().await;

        let comment = fx
            .service
            .add(fx.post_id, fx.author_id, "attached")
            .await
            .expect("Add failed");

        // Addressing the comment under the wrong post id resolves to
        // NotFound rather than acting on it
        let result = fx
            .service
            .get_owned(fx.post_id + 1, comment.id, fx.author_id)
            .await;
        assert!(matches!(result, Err(CommentServiceError::NotFound)));
    }
}

//! Post model
//!
//! This module provides:
//! - `Post` entity with scheduled-publish semantics
//! - `PostInput` carrying the author-editable fields (the author itself is
//!   never part of the input; it is stamped server-side)
//! - `FeedEntry`, a post joined with its author, category and location and
//!   annotated with its comment count, as listings render it
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed page size for all post listings
pub const POSTS_PER_PAGE: u32 = 10;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// Post body text
    pub text: String,
    /// Publication timestamp; future values schedule the post
    pub pub_date: DateTime<Utc>,
    /// Author user ID
    pub author_id: i64,
    /// Optional location ID
    pub location_id: Option<i64>,
    /// Optional category ID
    pub category_id: Option<i64>,
    /// Optional image path
    pub image: Option<String>,
    /// Publish flag; unpublished posts are visible to the author only
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Whether the post is publicly visible at `now`, given the publish
    /// flag of its category (`None` when the post has no category).
    ///
    /// This is the single visibility rule every public listing and the
    /// detail page apply: published, category published or absent, and
    /// publication date not in the future.
    pub fn is_visible_at(&self, category_published: Option<bool>, now: DateTime<Utc>) -> bool {
        self.is_published && category_published.unwrap_or(true) && self.pub_date <= now
    }
}

/// Author-editable post fields, used for both create and update.
///
/// Mirrors the post form: everything except the author, which the caller
/// supplies separately from the authenticated principal.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub is_published: bool,
}

impl PostInput {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            pub_date: None,
            location_id: None,
            category_id: None,
            image: None,
            is_published: true,
        }
    }

    pub fn with_pub_date(mut self, pub_date: DateTime<Utc>) -> Self {
        self.pub_date = Some(pub_date);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }
}

/// A post as listings and the detail page render it: joined with the
/// author's username, the category title/slug and location name (when
/// present), and annotated with the number of comments.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub location_name: Option<String>,
    pub comment_count: i64,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: POSTS_PER_PAGE,
        }
    }
}

impl ListParams {
    /// Pagination for the given 1-indexed page at the fixed feed page size
    pub fn for_page(page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: POSTS_PER_PAGE,
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        ((self.page.saturating_sub(1)) * self.per_page) as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Offset/limit always describe disjoint, consecutive windows.
        #[test]
        fn pagination_windows_are_consecutive(page in 1u32..1000) {
            let params = ListParams::for_page(page);
            let next = ListParams::for_page(page + 1);
            prop_assert_eq!(params.offset() + params.limit(), next.offset());
        }

        /// total_pages covers exactly the item count.
        #[test]
        fn total_pages_covers_all_items(total in 0i64..100_000) {
            let params = ListParams::for_page(1);
            let result = PagedResult::new(Vec::<i64>::new(), total, &params);
            let pages = result.total_pages() as i64;
            prop_assert!(pages * (params.per_page as i64) >= total);
            prop_assert!((pages - 1).max(0) * (params.per_page as i64) < total || total == 0);
        }
    }
}

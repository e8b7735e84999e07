//! Web layer - pages and routing
//!
//! One handler per HTTP-facing operation, composed into the router below.
//! Authentication is a cookie-validating layer that never rejects;
//! handlers opt into a required principal through the `AuthenticatedUser`
//! extractor.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod posts;
pub mod profiles;
pub mod render;

pub use error::PageError;
pub use middleware::{AppState, AuthenticatedUser};

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::models::PagedResult;

/// `?page=N` query parameter, defaulting to the first page
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

/// Put a paginated listing and its navigation flags into a template context
pub(crate) fn insert_page<T: Serialize>(ctx: &mut tera::Context, page: &PagedResult<T>) {
    ctx.insert("page", page);
    ctx.insert("has_next", &page.has_next());
    ctx.insert("has_prev", &page.has_prev());
    ctx.insert("next_page", &(page.page + 1));
    ctx.insert("prev_page", &page.page.saturating_sub(1).max(1));
    ctx.insert("total_pages", &page.total_pages());
}

async fn not_found() -> PageError {
    PageError::NotFound
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(posts::index))
        .route("/posts/create/", get(posts::create_form).post(posts::create))
        .route("/posts/{post_id}/", get(posts::detail))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form).post(posts::update),
        )
        .route(
            "/posts/{post_id}/delete/",
            get(posts::delete_form).post(posts::delete),
        )
        .route(
            "/posts/{post_id}/add_comment/",
            get(comments::create_form).post(comments::create),
        )
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(comments::edit_form).post(comments::update),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(comments::delete_form).post(comments::delete),
        )
        .route("/category/{slug}/", get(categories::detail))
        .route("/profile/{username}/", get(profiles::detail))
        .route(
            "/edit_profile/",
            get(profiles::edit_form).post(profiles::update),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .route(
            "/auth/registration/",
            get(auth::register_form).post(auth::register),
        )
        .fallback(not_found)
        .layer(
            tower::ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::optional_auth,
                )),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CategoryRepository, PostRepository, SqlxCategoryRepository, SqlxPostRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{NewCategory, PostInput};
    use crate::web::render::Templates;
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use std::path::Path;
    use std::sync::Arc;

    async fn test_server() -> (TestServer, DynDatabasePool) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let templates =
            Arc::new(Templates::load(Path::new("templates")).expect("Failed to load templates"));
        let state = AppState::build(pool.clone(), templates);
        let server = TestServer::new(build_router(state)).expect("Failed to build test server");

        (server, pool)
    }

    /// Register a user over HTTP and return their session token
    async fn register(server: &TestServer, username: &str) -> String {
        let email = format!("{}@example.com", username);
        let response = server
            .post("/auth/registration/")
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("password1", "pw123456"),
                ("password2", "pw123456"),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let set_cookie = response.header(header::SET_COOKIE);
        let set_cookie = set_cookie.to_str().expect("Invalid Set-Cookie");
        let token = set_cookie
            .strip_prefix("session=")
            .and_then(|rest| rest.split(';').next())
            .expect("No session token in Set-Cookie");
        token.to_string()
    }

    fn cookie(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("session={}", token)).expect("Invalid cookie")
    }

    async fn user_id(pool: &DynDatabasePool, username: &str) -> i64 {
        SqlxUserRepository::new(pool.clone())
            .get_by_username(username)
            .await
            .expect("Lookup failed")
            .expect("User missing")
            .id
    }

    fn visible_post(title: &str) -> PostInput {
        PostInput::new(title, "body").with_pub_date(Utc::now() - Duration::hours(1))
    }

    #[tokio::test]
    async fn test_front_page_shows_only_visible_posts_newest_first() {
        let (server, pool) = test_server().await;
        let token = register(&server, "writer").await;
        let author = user_id(&pool, "writer").await;
        drop(token);

        let posts = SqlxPostRepository::new(pool.clone());
        posts
            .create(
                &PostInput::new("Older public", "x")
                    .with_pub_date(Utc::now() - Duration::days(2)),
                author,
            )
            .await
            .expect("create");
        posts
            .create(&visible_post("Newer public"), author)
            .await
            .expect("create");
        posts
            .create(&visible_post("Hidden draft").unpublished(), author)
            .await
            .expect("create");
        posts
            .create(
                &PostInput::new("Scheduled", "x").with_pub_date(Utc::now() + Duration::days(1)),
                author,
            )
            .await
            .expect("create");

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body = response.text();
        assert!(body.contains("Newer public"));
        assert!(body.contains("Older public"));
        assert!(!body.contains("Hidden draft"));
        assert!(!body.contains("Scheduled"));

        // Newest first
        let newer = body.find("Newer public").unwrap();
        let older = body.find("Older public").unwrap();
        assert!(newer < older);
    }

    #[tokio::test]
    async fn test_create_requires_login() {
        let (server, _pool) = test_server().await;

        let response = server.get("/posts/create/").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let location = response.header(header::LOCATION);
        assert!(location.to_str().unwrap().starts_with("/auth/login/"));
    }

    #[tokio::test]
    async fn test_create_stamps_author_and_redirects_to_profile() {
        let (server, pool) = test_server().await;
        let token = register(&server, "poster").await;

        // A smuggled author field is not part of the form and is ignored
        let response = server
            .post("/posts/create/")
            .add_header(header::COOKIE, cookie(&token))
            .form(&[
                ("title", "From the form"),
                ("text", "hello"),
                ("pub_date", "2024-01-01T10:00"),
                ("is_published", "on"),
                ("author", "999"),
                ("author_id", "999"),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(header::LOCATION).to_str().unwrap(),
            "/profile/poster/"
        );

        let author = user_id(&pool, "poster").await;
        let posts = SqlxPostRepository::new(pool.clone())
            .list_by_author(author, 0, 10)
            .await
            .expect("Listing failed");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.title, "From the form");
        assert_eq!(posts[0].post.author_id, author);
    }

    #[tokio::test]
    async fn test_non_author_edit_redirects_to_detail() {
        let (server, pool) = test_server().await;
        let _author_token = register(&server, "owner").await;
        let intruder_token = register(&server, "intruder").await;

        let author = user_id(&pool, "owner").await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(&visible_post("Owned"), author)
            .await
            .expect("create");

        let response = server
            .get(&format!("/posts/{}/edit/", post.id))
            .add_header(header::COOKIE, cookie(&intruder_token))
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(header::LOCATION).to_str().unwrap(),
            format!("/posts/{}/", post.id)
        );

        // Posting an edit bounces the same way, without applying it
        let response = server
            .post(&format!("/posts/{}/edit/", post.id))
            .add_header(header::COOKIE, cookie(&intruder_token))
            .form(&[("title", "Hijacked"), ("text", "x")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let unchanged = SqlxPostRepository::new(pool.clone())
            .get_by_id(post.id)
            .await
            .expect("Lookup failed")
            .expect("Post missing");
        assert_eq!(unchanged.title, "Owned");
    }

    #[tokio::test]
    async fn test_hidden_post_detail_is_404_for_others_200_for_author() {
        let (server, pool) = test_server().await;
        let author_token = register(&server, "secretive").await;
        let reader_token = register(&server, "reader").await;

        let author = user_id(&pool, "secretive").await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(&visible_post("Secret").unpublished(), author)
            .await
            .expect("create");

        let url = format!("/posts/{}/", post.id);

        let response = server.get(&url).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server
            .get(&url)
            .add_header(header::COOKIE, cookie(&reader_token))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server
            .get(&url)
            .add_header(header::COOKIE, cookie(&author_token))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Secret"));
    }

    #[tokio::test]
    async fn test_author_delete_redirects_home_and_removes_post() {
        let (server, pool) = test_server().await;
        let token = register(&server, "pruner").await;
        let author = user_id(&pool, "pruner").await;

        let post = SqlxPostRepository::new(pool.clone())
            .create(&visible_post("Doomed"), author)
            .await
            .expect("create");

        let response = server
            .post(&format!("/posts/{}/delete/", post.id))
            .add_header(header::COOKIE, cookie(&token))
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION).to_str().unwrap(), "/");

        let gone = SqlxPostRepository::new(pool.clone())
            .get_by_id(post.id)
            .await
            .expect("Lookup failed");
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_category_page() {
        let (server, pool) = test_server().await;
        let _token = register(&server, "categorized").await;
        let author = user_id(&pool, "categorized").await;

        let categories = SqlxCategoryRepository::new(pool.clone());
        let open = categories
            .create(&NewCategory::new("Open", "All out in the open", "open"))
            .await
            .expect("create category");
        categories
            .create(&NewCategory::new("Closed", "d", "closed").unpublished())
            .await
            .expect("create category");

        SqlxPostRepository::new(pool.clone())
            .create(&visible_post("Categorized").with_category(open.id), author)
            .await
            .expect("create");

        let response = server.get("/category/open/").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Categorized"));

        let response = server.get("/category/closed/").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server.get("/category/missing/").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_profile_owner_sees_drafts_others_do_not() {
        let (server, pool) = test_server().await;
        let owner_token = register(&server, "profiled").await;
        let author = user_id(&pool, "profiled").await;

        let posts = SqlxPostRepository::new(pool.clone());
        posts
            .create(&visible_post("Public entry"), author)
            .await
            .expect("create");
        posts
            .create(&visible_post("Draft entry").unpublished(), author)
            .await
            .expect("create");

        let response = server
            .get("/profile/profiled/")
            .add_header(header::COOKIE, cookie(&owner_token))
            .await;
        let body = response.text();
        assert!(body.contains("Public entry"));
        assert!(body.contains("Draft entry"));

        let response = server.get("/profile/profiled/").await;
        let body = response.text();
        assert!(body.contains("Public entry"));
        assert!(!body.contains("Draft entry"));

        let response = server.get("/profile/nobody/").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_profile_updates_current_user_and_redirects_home() {
        let (server, pool) = test_server().await;
        let token = register(&server, "editable").await;

        let response = server
            .post("/edit_profile/")
            .add_header(header::COOKIE, cookie(&token))
            .form(&[
                ("first_name", "Edith"),
                ("last_name", "Able"),
                ("username", "editable"),
                ("email", "edith@example.com"),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION).to_str().unwrap(), "/");

        let user = SqlxUserRepository::new(pool.clone())
            .get_by_username("editable")
            .await
            .expect("Lookup failed")
            .expect("User missing");
        assert_eq!(user.first_name, "Edith");
        assert_eq!(user.email, "edith@example.com");
    }

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let (server, pool) = test_server().await;
        let author_token = register(&server, "blogger").await;
        let commenter_token = register(&server, "commenter").await;

        let author = user_id(&pool, "blogger").await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(&visible_post("Commented"), author)
            .await
            .expect("create");
        let detail_url = format!("/posts/{}/", post.id);

        // Anonymous commenting requires login
        let response = server
            .post(&format!("/posts/{}/add_comment/", post.id))
            .form(&[("text", "anon")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(response
            .header(header::LOCATION)
            .to_str()
            .unwrap()
            .starts_with("/auth/login/"));

        // Authenticated comment lands on the detail page
        let response = server
            .post(&format!("/posts/{}/add_comment/", post.id))
            .add_header(header::COOKIE, cookie(&commenter_token))
            .form(&[("text", "Well said")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(header::LOCATION).to_str().unwrap(),
            detail_url
        );

        let response = server.get(&detail_url).await;
        assert!(response.text().contains("Well said"));

        // Find the comment id for the ownership checks
        let comments = crate::db::repositories::SqlxCommentRepository::new(pool.clone());
        use crate::db::repositories::CommentRepository;
        let listed = comments.list_by_post(post.id).await.expect("Listing failed");
        let comment_id = listed[0].comment.id;

        // The post's author is not the comment's author: redirected, not applied
        let response = server
            .get(&format!(
                "/posts/{}/edit_comment/{}/",
                post.id, comment_id
            ))
            .add_header(header::COOKIE, cookie(&author_token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(header::LOCATION).to_str().unwrap(),
            detail_url
        );

        // The comment's author edits it
        let response = server
            .post(&format!(
                "/posts/{}/edit_comment/{}/",
                post.id, comment_id
            ))
            .add_header(header::COOKIE, cookie(&commenter_token))
            .form(&[("text", "Edited remark")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let listed = comments.list_by_post(post.id).await.expect("Listing failed");
        assert_eq!(listed[0].comment.text, "Edited remark");

        // And deletes it
        let response = server
            .post(&format!(
                "/posts/{}/delete_comment/{}/",
                post.id, comment_id
            ))
            .add_header(header::COOKIE, cookie(&commenter_token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let listed = comments.list_by_post(post.id).await.expect("Listing failed");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_login_logout_roundtrip() {
        let (server, _pool) = test_server().await;
        let _token = register(&server, "sessions").await;

        // Fresh login with the registered credentials
        let response = server
            .post("/auth/login/")
            .form(&[
                ("username", "sessions"),
                ("password", "pw123456"),
                ("next", "/posts/create/"),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(header::LOCATION).to_str().unwrap(),
            "/posts/create/"
        );
        let set_cookie = response.header(header::SET_COOKIE);
        let token = set_cookie
            .to_str()
            .unwrap()
            .strip_prefix("session=")
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .to_string();

        // Wrong password re-renders the form instead of redirecting
        let response = server
            .post("/auth/login/")
            .form(&[("username", "sessions"), ("password", "wrong")])
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Invalid username or password"));

        // Logout clears the cookie and the session
        let response = server
            .post("/auth/logout/")
            .add_header(header::COOKIE, cookie(&token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(response
            .header(header::SET_COOKIE)
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        // The old token no longer authenticates
        let response = server
            .get("/posts/create/")
            .add_header(header::COOKIE, cookie(&token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(response
            .header(header::LOCATION)
            .to_str()
            .unwrap()
            .starts_with("/auth/login/"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (server, _pool) = test_server().await;

        let response = server.get("/no/such/page/").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}

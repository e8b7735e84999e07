//! Repository layer
//!
//! One repository per entity. Each is a trait (for service-level
//! substitution in tests) with a SQLx implementation dispatching on the
//! configured driver to per-backend query functions.

pub mod category;
pub mod comment;
pub mod location;
pub mod post;
pub mod session;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use location::{LocationRepository, SqlxLocationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

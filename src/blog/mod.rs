//! Flat-file MDX blog.
//!
//! Each `<slug>.mdx` file opens with a YAML frontmatter block. Posts are
//! parsed on demand, unpublished ones are dropped from every listing, and
//! listings are sorted newest first. Tag, search and pagination views are
//! computed over that list.

pub mod frontmatter;
pub mod loader;
pub mod markdown;
pub mod post;
pub mod query;

pub use loader::BlogLoader;
pub use markdown::Heading;
pub use post::{BlogError, BlogPost, BlogTag};
pub use query::BlogPage;

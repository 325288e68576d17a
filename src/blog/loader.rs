//! Reads the MDX content directory. Nothing is indexed or persisted; each
//! call parses the files it needs.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;

use super::post::{parse_post, BlogError, BlogPost, BlogTag};
use super::query;

const EXTENSION: &str = "mdx";

/// A slug names a file in the content directory and nothing else. The
/// file stem is taken as-is, so case and underscores are preserved.
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.contains(['/', '\\', '\0'])
        && !slug.contains("..")
}

#[derive(Debug, Clone)]
pub struct BlogLoader {
    dir: PathBuf,
}

impl BlogLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the content directory exists and can be listed.
    pub async fn is_readable(&self) -> bool {
        tokio::fs::read_dir(&self.dir).await.is_ok()
    }

    /// Read and parse one file. The slug is the file stem.
    pub async fn parse_file(&self, path: &Path) -> Result<BlogPost, BlogError> {
        let document = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BlogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let slug = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        parse_post(&slug, &document, path.to_path_buf())
    }

    async fn mdx_files(&self) -> Result<Vec<PathBuf>, BlogError> {
        let io_err = |source| BlogError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every published post, newest first. A missing content directory is
    /// created and yields an empty list; a malformed file is logged and
    /// skipped.
    pub async fn all_posts(&self) -> Vec<BlogPost> {
        if tokio::fs::metadata(&self.dir).await.is_err() {
            if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to create blog content directory");
            }
            return Vec::new();
        }

        let files = match self.mdx_files().await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(error = %e, "failed to list blog content directory");
                return Vec::new();
            }
        };

        let parsed = join_all(files.iter().map(|path| self.parse_file(path))).await;

        let mut posts: Vec<BlogPost> = parsed
            .into_iter()
            .filter_map(|result| match result {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed blog post");
                    None
                }
            })
            .filter(|post| post.published)
            .collect();

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        posts
    }

    /// Direct lookup by slug, matched exactly against the file stem.
    /// Returns unpublished posts too; `None` when the slug could escape the
    /// content directory, the file is missing or it fails to parse.
    pub async fn post_by_slug(&self, slug: &str) -> Option<BlogPost> {
        if !is_safe_slug(slug) {
            return None;
        }

        let path = self.dir.join(format!("{}.{}", slug, EXTENSION));
        match self.parse_file(&path).await {
            Ok(post) => Some(post),
            Err(BlogError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load blog post");
                None
            }
        }
    }

    pub async fn posts_by_tag(&self, tag: &str) -> Vec<BlogPost> {
        query::posts_by_tag(&self.all_posts().await, tag)
    }

    pub async fn posts_by_category(&self, category: &str) -> Vec<BlogPost> {
        query::posts_by_category(&self.all_posts().await, category)
    }

    pub async fn all_tags(&self) -> Vec<BlogTag> {
        query::all_tags(&self.all_posts().await)
    }

    pub async fn featured_posts(&self) -> Vec<BlogPost> {
        query::featured_posts(&self.all_posts().await)
    }

    pub async fn recent_posts(&self, limit: usize) -> Vec<BlogPost> {
        query::recent_posts(&self.all_posts().await, limit)
    }

    pub async fn search_posts(&self, q: &str) -> Vec<BlogPost> {
        query::search_posts(&self.all_posts().await, q)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn write_post(dir: &Path, slug: &str, frontmatter: &str, body: &str) {
        let doc = format!("---\n{}\n---\n{}", frontmatter.trim(), body);
        std::fs::write(dir.join(format!("{slug}.mdx")), doc).unwrap();
    }

    /// Three published posts, one draft and one malformed file.
    pub(crate) fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        write_post(
            dir,
            "first-post",
            "title: First\ndescription: The first one\ndate: 2024-01-05\ntags: [Rust, intro]",
            "## Getting Started\nhello world\n",
        );
        write_post(
            dir,
            "second-post",
            "title: Second\ndescription: Async things\ndate: 2024-03-10\ntags: [rust, async]\nfeatured: true",
            "# Async\n",
        );
        write_post(
            dir,
            "third-post",
            "title: Third\ndescription: Styling\ndate: 2024-02-20\ntags: [css]\ncategory: Frontend",
            "text\n",
        );
        write_post(
            dir,
            "draft",
            "title: Draft\ndescription: Not yet\ndate: 2024-04-01\npublished: false",
            "secret\n",
        );
        std::fs::write(dir.join("broken.mdx"), "# no frontmatter here\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
        tmp
    }

    #[tokio::test]
    async fn test_all_posts_sorted_published_only() {
        let tmp = fixture();
        let loader = BlogLoader::new(tmp.path());
        let slugs: Vec<String> = loader
            .all_posts()
            .await
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["second-post", "third-post", "first-post"]);
    }

    #[tokio::test]
    async fn test_unpublished_post_reachable_by_slug() {
        let tmp = fixture();
        let loader = BlogLoader::new(tmp.path());
        let draft = loader.post_by_slug("draft").await.unwrap();
        assert!(!draft.published);
        assert!(loader
            .all_posts()
            .await
            .iter()
            .all(|p| p.slug != "draft"));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_slug_is_none() {
        let tmp = fixture();
        let loader = BlogLoader::new(tmp.path());
        assert!(loader.post_by_slug("nope").await.is_none());
        assert!(loader.post_by_slug("../etc/passwd").await.is_none());
        assert!(loader.post_by_slug("broken").await.is_none());
        assert!(loader.post_by_slug("").await.is_none());
        assert!(loader.post_by_slug("..").await.is_none());
        assert!(loader.post_by_slug("sub\\first-post").await.is_none());
    }

    #[tokio::test]
    async fn test_every_listed_slug_resolves() {
        let tmp = fixture();
        write_post(
            tmp.path(),
            "Hello_World",
            "title: Hello\ndescription: Mixed case file\ndate: 2024-05-01",
            "body\n",
        );
        write_post(
            tmp.path(),
            "v1.2-release",
            "title: Release\ndescription: Dotted file\ndate: 2024-05-02",
            "body\n",
        );
        let loader = BlogLoader::new(tmp.path());

        let listed = loader.all_posts().await;
        assert!(listed.iter().any(|p| p.slug == "Hello_World"));
        assert!(listed.iter().any(|p| p.slug == "v1.2-release"));
        for post in &listed {
            let fetched = loader.post_by_slug(&post.slug).await;
            assert_eq!(fetched.map(|p| p.slug), Some(post.slug.clone()));
        }
    }

    #[tokio::test]
    async fn test_colon_in_title_is_listed() {
        let tmp = TempDir::new().unwrap();
        write_post(
            tmp.path(),
            "rust-guide",
            "title: Rust: A Guide\ndescription: Ownership basics\ndate: 2024-06-01",
            "## Ownership\n",
        );
        let loader = BlogLoader::new(tmp.path());
        let posts = loader.all_posts().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Rust: A Guide");
    }

    #[tokio::test]
    async fn test_missing_directory_is_created_and_empty() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("content").join("blog");
        let loader = BlogLoader::new(&dir);
        assert!(loader.all_posts().await.is_empty());
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_derived_views() {
        let tmp = fixture();
        let loader = BlogLoader::new(tmp.path());
        assert_eq!(loader.posts_by_tag("RUST").await.len(), 2);
        assert_eq!(loader.featured_posts().await.len(), 1);
        assert_eq!(loader.recent_posts(2).await.len(), 2);
        assert_eq!(loader.search_posts("async").await.len(), 1);
        assert_eq!(loader.posts_by_category("frontend").await.len(), 1);

        let tags = loader.all_tags().await;
        assert_eq!(tags[0].slug, "rust");
        assert_eq!(tags[0].count, 2);
        assert!(tags.iter().all(|t| t.slug != "draft"));
    }

    #[tokio::test]
    async fn test_headings_and_reading_time_populated() {
        let tmp = fixture();
        let loader = BlogLoader::new(tmp.path());
        let post = loader.post_by_slug("first-post").await.unwrap();
        assert_eq!(post.headings[0].id, "getting-started");
        assert_eq!(post.reading_time, 1);
    }
}

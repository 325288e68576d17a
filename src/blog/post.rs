use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::frontmatter;
use super::markdown::{extract_headings, reading_time, Heading};

#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("{}: missing frontmatter block", path.display())]
    MissingFrontmatter { path: PathBuf },

    #[error("{}: invalid frontmatter: {reason}", path.display())]
    InvalidFrontmatter { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub tags: Vec<String>,
    pub featured: bool,
    pub published: bool,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category: Option<String>,
    /// Minutes.
    pub reading_time: u32,
    pub headings: Vec<Heading>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogTag {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

/// Build a post from a whole MDX document. `path` is only used in errors.
pub fn parse_post(slug: &str, document: &str, path: PathBuf) -> Result<BlogPost, BlogError> {
    let (yaml, body) =
        frontmatter::split(document).ok_or_else(|| BlogError::MissingFrontmatter {
            path: path.clone(),
        })?;

    let meta = frontmatter::parse(yaml)
        .map_err(|reason| BlogError::InvalidFrontmatter { path, reason })?;

    let content = body.trim_start_matches(['\r', '\n']).to_string();

    Ok(BlogPost {
        slug: slug.to_string(),
        title: meta.title,
        description: meta.description,
        date: meta.date,
        tags: meta.tags,
        featured: meta.featured,
        published: meta.published,
        author: meta.author,
        excerpt: meta.excerpt,
        cover_image: meta.cover_image,
        category: meta.category,
        reading_time: reading_time(&content),
        headings: extract_headings(&content),
        content,
    })
}

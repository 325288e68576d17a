//! Views over an already-loaded, published, date-sorted post list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::post::{BlogPost, BlogTag};

pub const MAX_PAGE_SIZE: usize = 50;

pub fn tag_slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Case-insensitive exact tag match.
pub fn posts_by_tag(posts: &[BlogPost], tag: &str) -> Vec<BlogPost> {
    let wanted = tag.trim().to_lowercase();
    posts
        .iter()
        .filter(|p| p.tags.iter().any(|t| t.to_lowercase() == wanted))
        .cloned()
        .collect()
}

pub fn posts_by_category(posts: &[BlogPost], category: &str) -> Vec<BlogPost> {
    let wanted = category.trim();
    posts
        .iter()
        .filter(|p| {
            p.category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
        })
        .cloned()
        .collect()
}

/// Tags with post counts, most used first. Spellings that share a slug are
/// merged under the first one seen.
pub fn all_tags(posts: &[BlogPost]) -> Vec<BlogTag> {
    let mut by_slug: HashMap<String, BlogTag> = HashMap::new();

    for post in posts {
        let mut seen_in_post: Vec<String> = Vec::new();
        for tag in &post.tags {
            let slug = tag_slug(tag);
            if seen_in_post.contains(&slug) {
                continue;
            }
            by_slug
                .entry(slug.clone())
                .or_insert_with(|| BlogTag {
                    name: tag.trim().to_string(),
                    slug: slug.clone(),
                    count: 0,
                })
                .count += 1;
            seen_in_post.push(slug);
        }
    }

    let mut tags: Vec<BlogTag> = by_slug.into_values().collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    tags
}

pub fn featured_posts(posts: &[BlogPost]) -> Vec<BlogPost> {
    posts.iter().filter(|p| p.featured).cloned().collect()
}

pub fn recent_posts(posts: &[BlogPost], limit: usize) -> Vec<BlogPost> {
    posts.iter().take(limit).cloned().collect()
}

/// Case-insensitive substring match over title, description and tags.
/// A blank query matches nothing.
pub fn search_posts(posts: &[BlogPost], query: &str) -> Vec<BlogPost> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    posts
        .iter()
        .filter(|p| {
            p.title.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
                || p.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPage {
    pub items: Vec<BlogPost>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// One page of `posts`. `page` is 1-based and clamped to at least 1;
/// `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
pub fn paginate(posts: &[BlogPost], page: usize, page_size: usize) -> BlogPage {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total = posts.len();
    let offset = (page - 1).saturating_mul(page_size);

    BlogPage {
        items: posts.iter().skip(offset).take(page_size).cloned().collect(),
        page,
        page_size,
        total,
        total_pages: total.div_ceil(page_size),
    }
}

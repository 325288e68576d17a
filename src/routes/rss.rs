//! RSS 2.0 feed of published posts.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::NaiveDate;

use crate::blog::BlogPost;
use crate::config::SiteConfig;
use crate::AppState;

const FEED_ITEMS: usize = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Posts carry a date only; they are published at midnight UTC.
fn rfc822(date: NaiveDate) -> String {
    format!("{} 00:00:00 +0000", date.format("%a, %d %b %Y"))
}

fn render_item(site: &SiteConfig, post: &BlogPost) -> String {
    let url = escape_xml(&format!("{}/blog/{}", site.url, post.slug));
    let categories: String = post
        .tags
        .iter()
        .map(|t| format!("      <category>{}</category>\n", escape_xml(t)))
        .collect();

    format!(
        "    <item>\n\
         \x20     <title>{}</title>\n\
         \x20     <link>{url}</link>\n\
         \x20     <description>{}</description>\n\
         \x20     <pubDate>{}</pubDate>\n\
         \x20     <guid isPermaLink=\"true\">{url}</guid>\n\
         {categories}\
         \x20   </item>\n",
        escape_xml(&post.title),
        escape_xml(post.excerpt.as_deref().unwrap_or(&post.description)),
        rfc822(post.date),
    )
}

pub fn render_feed(site: &SiteConfig, posts: &[BlogPost]) -> String {
    let items: String = posts
        .iter()
        .take(FEED_ITEMS)
        .map(|post| render_item(site, post))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&site.title),
        escape_xml(&format!("{}/blog", site.url)),
        escape_xml(&site.description),
        escape_xml(&format!("{}/rss.xml", site.url)),
        posts.first().map(|p| rfc822(p.date)).unwrap_or_default(),
        items,
    )
}

/// GET /rss.xml
pub async fn rss_feed(State(state): State<AppState>) -> impl IntoResponse {
    let posts = state.blog.all_posts().await;
    let xml = render_feed(&state.config.site, &posts);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        xml,
    )
}

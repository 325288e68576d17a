//! Derived fields computed from a post body.

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const WORDS_PER_MINUTE: usize = 200;

lazy_static::lazy_static! {
    static ref HEADING_REGEX: Regex = Regex::new(r"^(#{1,6})\s+(.+?)\s*$").unwrap();
    static ref CLOSING_HASHES: Regex = Regex::new(r"\s+#+\s*$").unwrap();
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9\s-]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref HYPHEN_RUN: Regex = Regex::new(r"-+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Anchor id for a heading. Must match the id the renderer puts on the
/// heading element, or table-of-contents links break.
pub fn heading_id(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lower, "");
    let hyphenated = WHITESPACE_RUN.replace_all(stripped.trim(), "-");
    HYPHEN_RUN
        .replace_all(&hyphenated, "-")
        .trim_matches('-')
        .to_string()
}

/// ATX headings (`#` through `######`) outside fenced code blocks.
pub fn extract_headings(body: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(caps) = HEADING_REGEX.captures(line) {
            // Only a `#` run set off by whitespace closes the heading; `C#` keeps its hash.
            let text = CLOSING_HASHES.replace(&caps[2], "").trim().to_string();
            if text.is_empty() || text.chars().all(|c| c == '#') {
                continue;
            }
            headings.push(Heading {
                id: heading_id(&text),
                level: caps[1].len() as u8,
                text,
            });
        }
    }

    headings
}

/// Whole minutes at [`WORDS_PER_MINUTE`], rounded up, at least one.
pub fn reading_time(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

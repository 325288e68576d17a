//! Frontmatter block: split from the body, parsed as YAML, then validated.
//! Authors write plain `key: value` lines that are not always valid YAML
//! (`title: Rust: A Guide`), so a line scan backs up the YAML parser.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

const DELIMITER: &str = "---";

/// Split a document into its frontmatter source and body. `None` when the
/// document does not open with a `---` fenced block.
pub fn split(document: &str) -> Option<(&str, &str)> {
    let document = document.strip_prefix('\u{feff}').unwrap_or(document);
    let mut lines = document.split_inclusive('\n');

    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &document[start..offset];
            let body = &document[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// `true`/`false` or the string forms authors tend to write. Anything other
/// than `"true"` counts as false.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// Either a YAML list or a single comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Csv(String),
}

impl TagList {
    fn into_tags(self) -> Vec<String> {
        let raw = match self {
            TagList::List(list) => list,
            TagList::Csv(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Scalar that may have been written unquoted as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Text {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Text {
    fn into_string(self) -> String {
        match self {
            Text::Str(s) => s,
            Text::Int(i) => i.to_string(),
            Text::Float(f) => f.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrontmatter {
    title: Option<Text>,
    description: Option<Text>,
    date: Option<Text>,
    tags: Option<TagList>,
    featured: Option<Flag>,
    published: Option<Flag>,
    author: Option<String>,
    excerpt: Option<String>,
    cover_image: Option<String>,
    category: Option<String>,
}

impl RawFrontmatter {
    fn has_required(&self) -> bool {
        self.title.is_some() && self.description.is_some() && self.date.is_some()
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn scalar(value: &str) -> Option<Text> {
    (!value.is_empty()).then(|| Text::Str(value.to_string()))
}

/// Line-oriented reading: each `key: value` line splits at its first colon
/// and the value is taken verbatim, minus surrounding quotes.
fn scan(source: &str) -> RawFrontmatter {
    let mut raw = RawFrontmatter::default();
    let mut tag_items: Vec<String> = Vec::new();
    let mut in_tags = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || line.starts_with('#') {
            continue;
        }
        if in_tags {
            if let Some(item) = trimmed.strip_prefix('-') {
                tag_items.push(unquote(item).to_string());
                continue;
            }
            in_tags = false;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let value = unquote(value).to_string();

        match key.trim() {
            "title" => raw.title = scalar(&value),
            "description" => raw.description = scalar(&value),
            "date" => raw.date = scalar(&value),
            "tags" if value.is_empty() => in_tags = true,
            "tags" => raw.tags = Some(TagList::Csv(value)),
            "featured" => raw.featured = Some(Flag::Text(value)),
            "published" => raw.published = Some(Flag::Text(value)),
            "author" => raw.author = Some(value),
            "excerpt" => raw.excerpt = Some(value),
            "coverImage" => raw.cover_image = Some(value),
            "category" => raw.category = Some(value),
            _ => {}
        }
    }

    if !tag_items.is_empty() {
        raw.tags = Some(TagList::List(tag_items));
    }
    raw
}

/// Validated frontmatter.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub tags: Vec<String>,
    pub featured: bool,
    /// Absent means published.
    pub published: bool,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category: Option<String>,
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: Option<Text>, key: &str) -> Result<String, String> {
    non_empty(value.map(Text::into_string)).ok_or_else(|| format!("`{key}` is required"))
}

/// Parse and validate a frontmatter block.
pub fn parse(yaml: &str) -> Result<Frontmatter, String> {
    if yaml.trim().is_empty() {
        return Err("frontmatter block is empty".to_string());
    }
    let raw = match serde_yaml::from_str::<RawFrontmatter>(yaml) {
        Ok(raw) if raw.has_required() => raw,
        Ok(_) => scan(yaml),
        Err(e) => {
            let scanned = scan(yaml);
            if !scanned.has_required() {
                return Err(e.to_string());
            }
            scanned
        }
    };

    let title = required(raw.title, "title")?;
    let description = required(raw.description, "description")?;
    let date_text = required(raw.date, "date")?;
    let date = parse_date(&date_text).ok_or_else(|| format!("`date` is not a valid date: {date_text}"))?;

    Ok(Frontmatter {
        title,
        description,
        date,
        tags: raw.tags.map(TagList::into_tags).unwrap_or_default(),
        featured: raw.featured.as_ref().is_some_and(Flag::is_set),
        published: raw.published.as_ref().map_or(true, Flag::is_set),
        author: non_empty(raw.author),
        excerpt: non_empty(raw.excerpt),
        cover_image: non_empty(raw.cover_image),
        category: non_empty(raw.category),
    })
}

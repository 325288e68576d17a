//! Language breakdown across sampled repositories.

use std::collections::HashMap;

use super::models::LanguageStat;

/// Color for languages missing from the palette.
pub const DEFAULT_LANGUAGE_COLOR: &str = "#858585";

/// Number of languages returned.
pub const TOP_LANGUAGES: usize = 6;

const LANGUAGE_COLORS: &[(&str, &str)] = &[
    ("JavaScript", "#f1e05a"),
    ("TypeScript", "#3178c6"),
    ("Python", "#3572A5"),
    ("Rust", "#dea584"),
    ("Go", "#00ADD8"),
    ("Java", "#b07219"),
    ("Kotlin", "#A97BFF"),
    ("Swift", "#F05138"),
    ("C", "#555555"),
    ("C++", "#f34b7d"),
    ("C#", "#178600"),
    ("Ruby", "#701516"),
    ("PHP", "#4F5D95"),
    ("Dart", "#00B4AB"),
    ("Scala", "#c22d40"),
    ("Elixir", "#6e4a7e"),
    ("Haskell", "#5e5086"),
    ("Lua", "#000080"),
    ("Shell", "#89e051"),
    ("PowerShell", "#012456"),
    ("HTML", "#e34c26"),
    ("CSS", "#563d7c"),
    ("SCSS", "#c6538c"),
    ("Vue", "#41b883"),
    ("Svelte", "#ff3e00"),
    ("Astro", "#ff5a03"),
    ("MDX", "#fcb32c"),
    ("Jupyter Notebook", "#DA5B0B"),
    ("Dockerfile", "#384d54"),
    ("Nix", "#7e7eff"),
    ("Zig", "#ec915c"),
    ("Solidity", "#AA6746"),
];

pub fn language_color(name: &str) -> &'static str {
    LANGUAGE_COLORS
        .iter()
        .find(|(lang, _)| *lang == name)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_LANGUAGE_COLOR)
}

/// Sum per-repository byte maps and return the top languages by share of
/// the grand total, largest first. Percentages are rounded to one decimal.
pub fn aggregate_languages(per_repo: &[HashMap<String, u64>]) -> Vec<LanguageStat> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for map in per_repo {
        for (name, bytes) in map {
            *totals.entry(name.as_str()).or_insert(0) += bytes;
        }
    }

    let grand_total: u64 = totals.values().sum();
    if grand_total == 0 {
        return Vec::new();
    }

    let mut stats: Vec<LanguageStat> = totals
        .into_iter()
        .filter(|(_, bytes)| *bytes > 0)
        .map(|(name, bytes)| LanguageStat {
            name: name.to_string(),
            bytes,
            percentage: round1(bytes as f64 / grand_total as f64 * 100.0),
            color: language_color(name).to_string(),
        })
        .collect();

    // Byte count breaks percentage ties deterministically, then name.
    stats.sort_by(|a, b| {
        b.bytes
            .cmp(&a.bytes)
            .then_with(|| a.name.cmp(&b.name))
    });
    stats.truncate(TOP_LANGUAGES);
    stats
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

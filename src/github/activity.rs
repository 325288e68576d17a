//! Commit history from push events, and the contribution calendar
//! synthesized from it when GitHub's own calendar is unavailable.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::models::{Commit, ContributionCalendar, ContributionDay, ContributionWeek, Event};

/// Commits kept from the event stream.
pub const MAX_COMMITS: usize = 25;

/// Repo name used when an event carries none.
pub const UNKNOWN_REPO: &str = "Unknown";

const WEEKS: i64 = 52;
const DAYS_PER_WEEK: i64 = 7;

/// Map a daily count to a 0-4 intensity.
pub fn contribution_level(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=3 => 1,
        4..=6 => 2,
        7..=9 => 3,
        _ => 4,
    }
}

/// Flatten push events into commits, newest event first, capped at
/// [`MAX_COMMITS`].
pub fn commits_from_events(events: &[Event]) -> Vec<Commit> {
    events
        .iter()
        .filter(|event| event.kind == "PushEvent")
        .flat_map(|event| {
            let repo = event
                .repo
                .as_ref()
                .and_then(|r| r.name.clone())
                .unwrap_or_else(|| UNKNOWN_REPO.to_string());
            event.payload.commits.iter().map(move |c| Commit {
                date: event.created_at,
                message: c.message.clone(),
                repo: repo.clone(),
                sha: c.sha.chars().take(7).collect(),
            })
        })
        .take(MAX_COMMITS)
        .collect()
}

/// Bucket commits by UTC day into a 52x7 grid whose first day is 364 days
/// before `now`.
pub fn synthesize_calendar(commits: &[Commit], now: DateTime<Utc>) -> ContributionCalendar {
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for commit in commits {
        *per_day.entry(commit.date.date_naive()).or_insert(0) += 1;
    }

    let start = (now - Duration::days(WEEKS * DAYS_PER_WEEK)).date_naive();
    let mut total = 0;

    let weeks = (0..WEEKS)
        .map(|week| {
            let contribution_days = (0..DAYS_PER_WEEK)
                .map(|day| {
                    let date = start + Duration::days(week * DAYS_PER_WEEK + day);
                    let count = per_day.get(&date).copied().unwrap_or(0);
                    total += count;
                    ContributionDay {
                        date,
                        count,
                        level: contribution_level(count),
                    }
                })
                .collect();
            ContributionWeek { contribution_days }
        })
        .collect();

    ContributionCalendar {
        total_contributions: total,
        weeks,
    }
}

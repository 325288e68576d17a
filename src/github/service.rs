//! Snapshot orchestration and caching.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};

use super::client::GitHubClient;
use super::models::{GitHubData, GitHubStats, GitHubUser, Repository};
use crate::store::TtlStore;

/// Store key shared by every caller within one cache window.
pub const CACHE_KEY: &str = "github-data";

/// Repositories and commits kept in the returned snapshot.
pub const DISPLAY_REPOSITORIES: usize = 6;
pub const DISPLAY_COMMITS: usize = 5;

pub fn compute_stats(user: &GitHubUser, repos: &[Repository], current_year: i32) -> GitHubStats {
    GitHubStats {
        total_stars: repos.iter().map(|r| u64::from(r.stargazers_count)).sum(),
        total_forks: repos.iter().map(|r| u64::from(r.forks_count)).sum(),
        contribution_years: (current_year - user.created_at.year()).max(0),
    }
}

#[derive(Clone)]
pub struct GitHubService {
    client: GitHubClient,
    store: Arc<dyn TtlStore>,
    ttl: Duration,
}

impl GitHubService {
    pub fn new(client: GitHubClient, store: Arc<dyn TtlStore>, ttl: Duration) -> Self {
        Self { client, store, ttl }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Cached [`Self::fetch_snapshot`]. Error-shaped snapshots are returned
    /// but never stored, so the next request retries upstream.
    pub async fn snapshot(&self) -> GitHubData {
        if let Some(cached) = self.store.get(CACHE_KEY).await {
            match serde_json::from_value::<GitHubData>(cached) {
                Ok(data) => {
                    tracing::debug!("serving GitHub snapshot from cache");
                    return data;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable cached GitHub snapshot");
                    self.store.remove(CACHE_KEY).await;
                }
            }
        }

        let data = self.fetch_snapshot().await;
        if !data.is_error() {
            match serde_json::to_value(&data) {
                Ok(value) => self.store.set(CACHE_KEY, value, self.ttl).await,
                Err(e) => tracing::warn!(error = %e, "failed to cache GitHub snapshot"),
            }
        }
        data
    }

    /// Two fan-out stages: profile + repositories, then languages, commits
    /// and calendar.
    pub async fn fetch_snapshot(&self) -> GitHubData {
        let (user, repositories) =
            tokio::join!(self.client.fetch_user(), self.client.fetch_repositories());

        let user = match user {
            Some(user) => user,
            None => {
                tracing::error!(username = %self.client.username(), "GitHub user unavailable");
                return GitHubData::failed("Failed to fetch GitHub user");
            }
        };
        if repositories.is_empty() {
            tracing::error!(username = %self.client.username(), "no GitHub repositories available");
            return GitHubData::failed("Failed to fetch GitHub repositories");
        }

        let stats = compute_stats(&user, &repositories, Utc::now().year());

        let (languages, mut commits, commit_calendar) = tokio::join!(
            self.client.fetch_languages(&repositories),
            self.client.fetch_recent_commits(),
            self.client.fetch_contribution_calendar(),
        );

        let mut repositories = repositories;
        repositories.truncate(DISPLAY_REPOSITORIES);
        commits.truncate(DISPLAY_COMMITS);

        tracing::info!(
            repositories = repositories.len(),
            languages = languages.len(),
            commits = commits.len(),
            "GitHub snapshot assembled"
        );

        GitHubData {
            user: Some(user),
            repositories,
            languages,
            commits,
            commit_calendar,
            stats,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::tests::{config_for, spawn_fake_github, unreachable_base, Hits};
    use crate::store::MemoryStore;
    use std::sync::atomic::Ordering;

    async fn service(base: &str, token: Option<&str>) -> (GitHubService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let client = GitHubClient::new(&config_for(base, token)).unwrap();
        (
            GitHubService::new(client, store.clone(), Duration::from_secs(3600)),
            store,
        )
    }

    #[test]
    fn test_compute_stats_sums_counts() {
        let user: GitHubUser = serde_json::from_value(serde_json::json!({
            "login": "octo", "id": 1, "created_at": "2016-02-01T00:00:00Z"
        }))
        .unwrap();
        let repos: Vec<Repository> = serde_json::from_value(serde_json::json!([
            { "id": 1, "name": "a", "stargazers_count": 3, "forks_count": 1, "owner": { "login": "octo" } },
            { "id": 2, "name": "b", "stargazers_count": 4, "forks_count": 2, "owner": { "login": "octo" } }
        ]))
        .unwrap();

        let stats = compute_stats(&user, &repos, 2024);
        assert_eq!(stats.total_stars, 7);
        assert_eq!(stats.total_forks, 3);
        assert_eq!(stats.contribution_years, 8);
    }

    #[tokio::test]
    async fn test_snapshot_when_upstream_unreachable_is_error_shaped() {
        let base = unreachable_base().await;
        let (service, store) = service(&base, None).await;

        let data = service.snapshot().await;
        assert!(data.is_error());
        assert!(data.user.is_none());
        assert!(data.repositories.is_empty());
        assert_eq!(data.stats, GitHubStats::default());
        assert!(store.get(CACHE_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_assembles_and_truncates() {
        let base = spawn_fake_github(Arc::new(Hits::default())).await;
        let (service, _) = service(&base, None).await;

        let data = service.snapshot().await;
        assert!(!data.is_error());
        assert_eq!(data.user.as_ref().unwrap().login, "octo");
        assert!(data.repositories.len() <= DISPLAY_REPOSITORIES);
        assert!(data.commits.len() <= DISPLAY_COMMITS);
        assert_eq!(data.stats.total_stars, 8);
        assert_eq!(data.commit_calendar.weeks.len(), 52);
        assert_eq!(data.languages[0].name, "Rust");
    }

    #[tokio::test]
    async fn test_snapshot_is_served_from_cache() {
        let hits = Arc::new(Hits::default());
        let base = spawn_fake_github(hits.clone()).await;
        let (service, store) = service(&base, None).await;

        let first = service.snapshot().await;
        let language_calls = hits.languages.load(Ordering::SeqCst);
        let second = service.snapshot().await;

        assert_eq!(first, second);
        assert_eq!(hits.languages.load(Ordering::SeqCst), language_calls);
        assert!(store.get(CACHE_KEY).await.is_some());
    }
}

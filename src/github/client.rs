//! Thin GitHub REST/GraphQL client. Every public fetch degrades to a
//! neutral value instead of failing; the reason is logged at `warn`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures_util::future::join_all;
use serde::{de::DeserializeOwned, Deserialize};

use super::activity::{commits_from_events, contribution_level, synthesize_calendar, MAX_COMMITS};
use super::languages::aggregate_languages;
use super::models::{
    Commit, ContributionCalendar, ContributionDay, ContributionWeek, Event, GitHubUser,
    LanguageStat, Repository,
};
use crate::config::GitHubConfig;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("portfolio-site/", env!("CARGO_PKG_VERSION"));

/// Repositories requested per listing.
pub const REPOS_PER_PAGE: usize = 100;
/// Non-fork repositories sampled for the language breakdown.
pub const LANGUAGE_SAMPLE: usize = 20;
const EVENT_PAGES: u32 = 3;
const EVENTS_PER_PAGE: u32 = 100;

const CALENDAR_QUERY: &str = r#"
query {
  viewer {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
            contributionLevel
          }
        }
      }
    }
  }
}"#;

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no GitHub token configured")]
    MissingToken,

    #[error("GraphQL error: {0}")]
    GraphQl(String),
}

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    username: String,
    token: Option<String>,
    api_url: String,
    graphql_url: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            username: config.username.clone(),
            token: config.token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            graphql_url: config.graphql_url.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, authed: bool) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if authed {
            let token = self.token.as_deref().ok_or(GitHubError::MissingToken)?;
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| GitHubError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| GitHubError::Decode { url, source })
    }

    // ========================================================================
    // Profile and repositories
    // ========================================================================

    /// Authenticated `/user` first when a token exists, then the public
    /// profile. `None` when both fail.
    pub async fn fetch_user(&self) -> Option<GitHubUser> {
        if self.has_token() {
            match self.get_json::<GitHubUser>("/user", true).await {
                Ok(user) => return Some(user),
                Err(e) => tracing::warn!(error = %e, "authenticated user lookup failed, trying public profile"),
            }
        }

        match self
            .get_json::<GitHubUser>(&format!("/users/{}", self.username), false)
            .await
        {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, username = %self.username, "failed to fetch GitHub user");
                None
            }
        }
    }

    /// Up to 100 repositories by last update. The authenticated listing also
    /// returns collaborator and org repositories, so it is narrowed to the
    /// configured owner.
    pub async fn fetch_repositories(&self) -> Vec<Repository> {
        if self.has_token() {
            let path = format!("/user/repos?per_page={}&sort=updated", REPOS_PER_PAGE);
            match self.get_json::<Vec<Repository>>(&path, true).await {
                Ok(repos) => return owned_by(repos, &self.username),
                Err(e) => tracing::warn!(error = %e, "authenticated repository listing failed, trying public listing"),
            }
        }

        let path = format!(
            "/users/{}/repos?per_page={}&sort=updated",
            self.username, REPOS_PER_PAGE
        );
        match self.get_json::<Vec<Repository>>(&path, false).await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!(error = %e, username = %self.username, "failed to fetch repositories");
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Languages
    // ========================================================================

    /// Byte counts for one repository; empty on failure.
    pub async fn fetch_repo_languages(&self, repo: &Repository) -> HashMap<String, u64> {
        let path = format!("/repos/{}/{}/languages", repo.owner.login, repo.name);
        match self
            .get_json::<HashMap<String, u64>>(&path, self.has_token())
            .await
        {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, repo = %repo.name, "failed to fetch repository languages");
                HashMap::new()
            }
        }
    }

    /// Language breakdown over the first [`LANGUAGE_SAMPLE`] non-fork
    /// repositories, fetched concurrently.
    pub async fn fetch_languages(&self, repos: &[Repository]) -> Vec<LanguageStat> {
        let sample = repos.iter().filter(|r| !r.fork).take(LANGUAGE_SAMPLE);
        let maps = join_all(sample.map(|repo| self.fetch_repo_languages(repo))).await;
        aggregate_languages(&maps)
    }

    // ========================================================================
    // Activity
    // ========================================================================

    /// Most recent commits across public push events, newest first.
    pub async fn fetch_recent_commits(&self) -> Vec<Commit> {
        let mut events: Vec<Event> = Vec::new();

        for page in 1..=EVENT_PAGES {
            let path = format!(
                "/users/{}/events/public?per_page={}&page={}",
                self.username, EVENTS_PER_PAGE, page
            );
            match self
                .get_json::<Vec<Event>>(&path, self.has_token())
                .await
            {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    events.extend(batch);
                    if commits_from_events(&events).len() >= MAX_COMMITS {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, page, "failed to fetch public events");
                    break;
                }
            }
        }

        commits_from_events(&events)
    }

    /// GitHub's own calendar when a token is configured, otherwise one
    /// synthesized from recent commits.
    pub async fn fetch_contribution_calendar(&self) -> ContributionCalendar {
        if self.has_token() {
            match self.query_calendar().await {
                Ok(calendar) => return calendar,
                Err(e) => tracing::warn!(error = %e, "contribution calendar query failed, synthesizing from commits"),
            }
        }

        let commits = self.fetch_recent_commits().await;
        synthesize_calendar(&commits, Utc::now())
    }

    async fn query_calendar(&self) -> Result<ContributionCalendar, GitHubError> {
        let token = self.token.as_deref().ok_or(GitHubError::MissingToken)?;
        let url = self.graphql_url.clone();

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "query": CALENDAR_QUERY }))
            .send()
            .await
            .map_err(|source| GitHubError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|source| GitHubError::Decode { url, source })?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(GitHubError::GraphQl(messages.join("; ")));
        }

        body.data
            .map(|d| ContributionCalendar::from(d.viewer.contributions_collection.contribution_calendar))
            .ok_or_else(|| GitHubError::GraphQl("response carried no data".to_string()))
    }
}

fn owned_by(repos: Vec<Repository>, login: &str) -> Vec<Repository> {
    repos
        .into_iter()
        .filter(|r| r.owner.login.eq_ignore_ascii_case(login))
        .collect()
}

// ============================================================================
// GraphQL response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<CalendarData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CalendarData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Viewer {
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: RawCalendar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCalendar {
    total_contributions: u32,
    weeks: Vec<RawWeek>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeek {
    contribution_days: Vec<RawDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDay {
    date: NaiveDate,
    contribution_count: u32,
    #[serde(default)]
    contribution_level: Option<String>,
}

impl From<RawCalendar> for ContributionCalendar {
    fn from(raw: RawCalendar) -> Self {
        let weeks = raw
            .weeks
            .into_iter()
            .map(|week| ContributionWeek {
                contribution_days: week
                    .contribution_days
                    .into_iter()
                    .map(|day| ContributionDay {
                        date: day.date,
                        count: day.contribution_count,
                        level: quartile_level(day.contribution_level.as_deref())
                            .unwrap_or_else(|| contribution_level(day.contribution_count)),
                    })
                    .collect(),
            })
            .collect();

        ContributionCalendar {
            total_contributions: raw.total_contributions,
            weeks,
        }
    }
}

fn quartile_level(level: Option<&str>) -> Option<u8> {
    match level? {
        "NONE" => Some(0),
        "FIRST_QUARTILE" => Some(1),
        "SECOND_QUARTILE" => Some(2),
        "THIRD_QUARTILE" => Some(3),
        "FOURTH_QUARTILE" => Some(4),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::GitHubConfig;
    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// Hit counters for the fake upstream.
    #[derive(Default)]
    pub(crate) struct Hits {
        pub graphql: AtomicUsize,
        pub languages: AtomicUsize,
        pub events: AtomicUsize,
    }

    fn repo_json(id: u64, name: &str, owner: &str, fork: bool, stars: u32) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": null,
            "stargazers_count": stars,
            "forks_count": 1,
            "watchers_count": stars,
            "language": "Rust",
            "fork": fork,
            "owner": { "login": owner, "id": 1 }
        })
    }

    fn user_json() -> Value {
        json!({
            "login": "octo",
            "id": 1,
            "name": "Octo Cat",
            "bio": "builds things",
            "public_repos": 3,
            "followers": 10,
            "following": 2,
            "created_at": "2015-04-01T00:00:00Z"
        })
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer good-token")
    }

    /// Spawn a fake GitHub on a random local port and return its base URL.
    pub(crate) async fn spawn_fake_github(hits: Arc<Hits>) -> String {
        async fn user(headers: HeaderMap) -> impl IntoResponse {
            if authorized(&headers) {
                (StatusCode::OK, Json(user_json()))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" })))
            }
        }

        async fn public_user(Path(login): Path<String>) -> impl IntoResponse {
            if login == "octo" {
                (StatusCode::OK, Json(user_json()))
            } else {
                (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" })))
            }
        }

        async fn own_repos(headers: HeaderMap) -> impl IntoResponse {
            if !authorized(&headers) {
                return (StatusCode::UNAUTHORIZED, Json(json!({})));
            }
            (
                StatusCode::OK,
                Json(json!([
                    repo_json(1, "site", "Octo", false, 5),
                    repo_json(2, "org-thing", "some-org", false, 100),
                    repo_json(3, "forked", "octo", true, 1),
                ])),
            )
        }

        async fn public_repos(Path(login): Path<String>) -> impl IntoResponse {
            if login != "octo" {
                return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" })));
            }
            (
                StatusCode::OK,
                Json(json!([
                    repo_json(1, "site", "octo", false, 5),
                    repo_json(3, "forked", "octo", true, 1),
                    repo_json(4, "broken", "octo", false, 2),
                ])),
            )
        }

        async fn languages(
            State(hits): State<Arc<Hits>>,
            Path((_owner, name)): Path<(String, String)>,
        ) -> impl IntoResponse {
            hits.languages.fetch_add(1, Ordering::SeqCst);
            match name.as_str() {
                "site" => (StatusCode::OK, Json(json!({ "Rust": 750, "TypeScript": 250 }))),
                "org-thing" => (StatusCode::OK, Json(json!({ "Go": 1000 }))),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
            }
        }

        async fn events(
            State(hits): State<Arc<Hits>>,
            Query(query): Query<HashMap<String, String>>,
        ) -> impl IntoResponse {
            hits.events.fetch_add(1, Ordering::SeqCst);
            if query.get("page").map(String::as_str) != Some("1") {
                return Json(json!([]));
            }
            let now = Utc::now().to_rfc3339();
            Json(json!([
                {
                    "type": "PushEvent",
                    "repo": { "name": "octo/site" },
                    "created_at": now,
                    "payload": { "commits": [
                        { "sha": "aaaaaaaaaaaa", "message": "fix nav" },
                        { "sha": "bbbbbbbbbbbb", "message": "add post" }
                    ]}
                },
                {
                    "type": "WatchEvent",
                    "repo": { "name": "other/repo" },
                    "created_at": now,
                    "payload": {}
                }
            ]))
        }

        async fn graphql(State(hits): State<Arc<Hits>>, headers: HeaderMap) -> impl IntoResponse {
            hits.graphql.fetch_add(1, Ordering::SeqCst);
            if !authorized(&headers) {
                return (StatusCode::UNAUTHORIZED, Json(json!({})));
            }
            (
                StatusCode::OK,
                Json(json!({
                    "data": { "viewer": { "contributionsCollection": { "contributionCalendar": {
                        "totalContributions": 5,
                        "weeks": [
                            { "contributionDays": [
                                { "date": "2024-01-07", "contributionCount": 0, "contributionLevel": "NONE" },
                                { "date": "2024-01-08", "contributionCount": 5, "contributionLevel": "FOURTH_QUARTILE" }
                            ]}
                        ]
                    }}}}
                })),
            )
        }

        let app = Router::new()
            .route("/user", get(user))
            .route("/users/{login}", get(public_user))
            .route("/user/repos", get(own_repos))
            .route("/users/{login}/repos", get(public_repos))
            .route("/repos/{owner}/{name}/languages", get(languages))
            .route("/users/{login}/events/public", get(events))
            .route("/graphql", post(graphql))
            .with_state(hits);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub(crate) fn config_for(base: &str, token: Option<&str>) -> GitHubConfig {
        GitHubConfig {
            username: "octo".to_string(),
            token: token.map(str::to_string),
            api_url: base.to_string(),
            graphql_url: format!("{}/graphql", base),
            cache_ttl: Duration::from_secs(3600),
        }
    }

    /// Base URL of a port nothing listens on.
    pub(crate) async fn unreachable_base() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_user_falls_back_to_public_profile() {
        let base = spawn_fake_github(Arc::new(Hits::default())).await;
        let client = GitHubClient::new(&config_for(&base, Some("bad-token"))).unwrap();
        let user = client.fetch_user().await.unwrap();
        assert_eq!(user.login, "octo");
    }

    #[tokio::test]
    async fn test_fetch_user_returns_none_when_unreachable() {
        let base = unreachable_base().await;
        let client = GitHubClient::new(&config_for(&base, Some("good-token"))).unwrap();
        assert!(client.fetch_user().await.is_none());
    }

    #[tokio::test]
    async fn test_authenticated_repositories_filtered_to_owner() {
        let base = spawn_fake_github(Arc::new(Hits::default())).await;
        let client = GitHubClient::new(&config_for(&base, Some("good-token"))).unwrap();
        let repos = client.fetch_repositories().await;
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["site", "forked"]);
    }

    #[tokio::test]
    async fn test_repositories_empty_when_unreachable() {
        let base = unreachable_base().await;
        let client = GitHubClient::new(&config_for(&base, None)).unwrap();
        assert!(client.fetch_repositories().await.is_empty());
    }

    #[tokio::test]
    async fn test_languages_skip_forks_and_tolerate_failures() {
        let hits = Arc::new(Hits::default());
        let base = spawn_fake_github(hits.clone()).await;
        let client = GitHubClient::new(&config_for(&base, None)).unwrap();

        let repos = client.fetch_repositories().await;
        let stats = client.fetch_languages(&repos).await;

        // "forked" is skipped, "broken" answers 500 and counts as zero.
        assert_eq!(hits.languages.load(Ordering::SeqCst), 2);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "Rust");
        assert_eq!(stats[0].percentage, 75.0);
        assert_eq!(stats[1].percentage, 25.0);
    }

    #[tokio::test]
    async fn test_recent_commits_flatten_push_events() {
        let base = spawn_fake_github(Arc::new(Hits::default())).await;
        let client = GitHubClient::new(&config_for(&base, None)).unwrap();
        let commits = client.fetch_recent_commits().await;
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "fix nav");
        assert_eq!(commits[0].sha, "aaaaaaa");
        assert_eq!(commits[0].repo, "octo/site");
    }

    #[tokio::test]
    async fn test_calendar_without_token_never_queries_graphql() {
        let hits = Arc::new(Hits::default());
        let base = spawn_fake_github(hits.clone()).await;
        let client = GitHubClient::new(&config_for(&base, None)).unwrap();

        let calendar = client.fetch_contribution_calendar().await;

        assert_eq!(hits.graphql.load(Ordering::SeqCst), 0);
        assert!(hits.events.load(Ordering::SeqCst) > 0);
        assert_eq!(calendar.weeks.len(), 52);
        assert!(calendar.weeks.iter().all(|w| w.contribution_days.len() == 7));
    }

    #[tokio::test]
    async fn test_calendar_with_token_uses_graphql() {
        let hits = Arc::new(Hits::default());
        let base = spawn_fake_github(hits.clone()).await;
        let client = GitHubClient::new(&config_for(&base, Some("good-token"))).unwrap();

        let calendar = client.fetch_contribution_calendar().await;

        assert_eq!(hits.graphql.load(Ordering::SeqCst), 1);
        assert_eq!(calendar.total_contributions, 5);
        assert_eq!(calendar.weeks[0].contribution_days[1].level, 4);
    }

    #[tokio::test]
    async fn test_calendar_falls_back_when_graphql_rejects_token() {
        let hits = Arc::new(Hits::default());
        let base = spawn_fake_github(hits.clone()).await;
        let client = GitHubClient::new(&config_for(&base, Some("bad-token"))).unwrap();

        let calendar = client.fetch_contribution_calendar().await;

        assert_eq!(hits.graphql.load(Ordering::SeqCst), 1);
        assert_eq!(calendar.weeks.len(), 52);
    }

    #[test]
    fn test_quartile_mapping() {
        assert_eq!(quartile_level(Some("NONE")), Some(0));
        assert_eq!(quartile_level(Some("THIRD_QUARTILE")), Some(3));
        assert_eq!(quartile_level(Some("???")), None);
        assert_eq!(quartile_level(None), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = GitHubClient::new(&config_for("http://x", Some("secret"))).unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("secret"));
    }
}

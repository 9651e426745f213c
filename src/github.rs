//! Minimal client for the GitHub releases endpoint.

use crate::error::GitHubError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REPOSITORY: &str = "payloadcms/payload";

const CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A release as returned by the GitHub REST API. Only the fields the sync
/// needs are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRelease {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl GitHubRelease {
    /// The release name, or the tag when the name is blank.
    pub fn title(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.tag_name.trim(),
        }
    }
}

#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn fetch_releases_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRelease>, GitHubError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    repository: String,
}

impl GitHubClient {
    /// Requests are authenticated with `token` when one is given; otherwise
    /// they run against GitHub's anonymous rate limit.
    pub fn new(api_url: &str, repository: &str, token: Option<&str>) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GitHubError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
        })
    }
}

#[async_trait]
impl ReleaseSource for GitHubClient {
    async fn fetch_releases_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRelease>, GitHubError> {
        let url = format!("{}/repos/{}/releases", self.api_url, self.repository);
        debug!(%url, page, per_page, "Fetching releases");

        let response = self
            .client
            .get(&url)
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::Status(status.as_u16()));
        }
        Ok(response.json::<Vec<GitHubRelease>>().await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn release_json(id: u64, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "tag_name": name,
            "name": name,
            "body": "### 🐛 Bug Fixes\n* fix",
            "draft": false,
            "prerelease": false,
            "published_at": "2024-05-01T12:00:00Z",
            "html_url": "https://github.com/payloadcms/payload/releases/tag/v3.0.0"
        })
    }

    #[tokio::test]
    async fn test_fetch_releases_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/payloadcms/payload/releases"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "30"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vec![release_json(7, "v3.0.0 (2024-05-01)")]),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            GitHubClient::new(&mock_server.uri(), DEFAULT_REPOSITORY, Some("secret")).unwrap();
        let releases = client.fetch_releases_page(2, 30).await.unwrap();

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].id, 7);
        assert_eq!(releases[0].title(), "v3.0.0 (2024-05-01)");
        assert!(releases[0].published_at.is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = GitHubClient::new(&mock_server.uri(), DEFAULT_REPOSITORY, None).unwrap();
        let err = client.fetch_releases_page(1, 30).await.unwrap_err();
        assert!(matches!(err, GitHubError::Status(403)));
    }

    #[test]
    fn test_title_falls_back_to_tag() {
        let release = GitHubRelease {
            id: 1,
            tag_name: "v3.1.0".into(),
            name: Some("  ".into()),
            body: None,
            draft: false,
            prerelease: false,
            published_at: None,
        };
        assert_eq!(release.title(), "v3.1.0");
    }
}

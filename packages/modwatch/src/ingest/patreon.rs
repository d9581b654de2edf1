//! Patreon-like post source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{FeedError, FeedResult};
use crate::traits::feed::PostSource;
use crate::types::post::FeedItem;

const DEFAULT_BASE_URL: &str = "https://www.patreon.com/api";

/// Client for the Patreon posts API.
#[derive(Clone)]
pub struct PatreonSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl Default for PatreonSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PatreonSource {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at a different API base (proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    data: Vec<PostData>,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    attributes: PostAttributes,
}

#[derive(Debug, Deserialize)]
struct PostAttributes {
    title: String,
    #[serde(default)]
    content: Option<String>,
    url: String,
    published_at: DateTime<Utc>,
    #[serde(default)]
    post_type: Option<String>,
    #[serde(default)]
    min_cents_pledged_to_view: Option<u32>,
}

#[async_trait]
impl PostSource for PatreonSource {
    async fn fetch_recent(&self, source_id: &str) -> FeedResult<Vec<FeedItem>> {
        debug!(source_id, "fetching posts");

        let response = self
            .http_client
            .get(format!("{}/posts", self.base_url))
            .query(&[
                ("filter[campaign_id]", source_id),
                (
                    "fields[post]",
                    "content,title,url,published_at,post_type,min_cents_pledged_to_view",
                ),
                ("sort", "-published_at"),
                ("filter[is_draft]", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Upstream(format!(
                "posts fetch for {source_id} returned {status}"
            )));
        }

        let parsed: PostsResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|post| FeedItem {
                id: post.id,
                title: post.attributes.title,
                url: post.attributes.url,
                content: post.attributes.content.unwrap_or_default(),
                published_at: post.attributes.published_at,
                post_type: post.attributes.post_type,
                min_cents_pledged: post.attributes.min_cents_pledged_to_view,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_tolerates_missing_optionals() {
        let body = serde_json::json!({
            "data": [{
                "id": "123",
                "type": "post",
                "attributes": {
                    "title": "Mod X Update",
                    "url": "https://patreon.com/posts/123",
                    "published_at": "2024-03-15T12:00:00Z"
                }
            }]
        });

        let parsed: PostsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert!(parsed.data[0].attributes.content.is_none());
        assert!(parsed.data[0].attributes.post_type.is_none());
    }
}

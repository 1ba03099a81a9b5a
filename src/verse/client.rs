use anyhow::Result;
use std::time::Duration;

use super::{FetchError, Verse};

/// HTTP client for the random verse endpoint (`GET {api_base}/?random=verse`)
#[derive(Debug, Clone)]
pub struct VerseClient {
    http: reqwest::Client,
    url: String,
}

impl VerseClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("versecard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: format!("{}/", api_base.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch one random verse. Single attempt, no retry.
    pub async fn fetch_random(&self) -> Result<Verse, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("random", "verse")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let verse = serde_json::from_str(&body)?;
        Ok(verse)
    }
}

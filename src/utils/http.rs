// src/utils/http.rs

//! HTTP fetching with robots.txt checks and a politeness delay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::robots::{RobotsRules, robots_url};

/// Source of document bodies for the crawl pipeline.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch `url` and return the response body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Sequential HTTP fetcher.
///
/// Every request is followed by a fixed pause before the response is
/// inspected, so consecutive fetches never overlap.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    delay: Duration,
    respect_robots: bool,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            user_agent: config.user_agent.clone(),
            delay: Duration::from_millis(config.request_delay_ms),
            respect_robots: config.respect_robots,
        })
    }

    /// Check robots.txt for `url`.
    ///
    /// A 401 or 403 answer disallows everything. Other failures allow.
    pub async fn allowed_by_robots(&self, url: &Url) -> bool {
        let Some(robots) = robots_url(url) else {
            return true;
        };

        let response = match self.client.get(robots.as_str()).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) if robots_denies_all(r.status()) => {
                log::debug!("robots.txt at {} returned {}", robots, r.status());
                return false;
            }
            Ok(r) => {
                log::debug!("robots.txt at {} returned {}", robots, r.status());
                return true;
            }
            Err(e) => {
                log::debug!("robots.txt at {} unavailable: {}", robots, e);
                return true;
            }
        };

        match response.text().await {
            Ok(body) => RobotsRules::parse(&body).is_allowed(&self.user_agent, url),
            Err(_) => true,
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Access-restricted robots.txt means the whole site is off limits.
fn robots_denies_all(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        if self.respect_robots && !self.allowed_by_robots(&parsed).await {
            return Err(AppError::RobotsBlocked(url.to_string()));
        }

        let response = self.client.get(parsed).header(ACCEPT, "*/*").send().await;
        self.pause().await;
        let response = response?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_from_default_config() {
        let config = CrawlerConfig::default();
        let fetcher = HttpFetcher::new(&config).unwrap();
        assert_eq!(fetcher.delay, Duration::from_millis(800));
        assert!(fetcher.respect_robots);
    }

    #[test]
    fn test_restricted_robots_denies_all() {
        assert!(robots_denies_all(StatusCode::UNAUTHORIZED));
        assert!(robots_denies_all(StatusCode::FORBIDDEN));
        assert!(!robots_denies_all(StatusCode::NOT_FOUND));
        assert!(!robots_denies_all(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_invalid_url_is_error() {
        let config = CrawlerConfig {
            request_delay_ms: 0,
            respect_robots: false,
            ..CrawlerConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, AppError::Url(_)));
    }
}

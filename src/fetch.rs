use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use scraper::Html;

use crate::config::FetchConfig;

static CLIENT: OnceCell<Client> = OnceCell::new();

fn shared_client(cfg: &FetchConfig) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("failed to build http client")
    })
}

/// Blocking page fetcher shared by every scraping component. One request per
/// call, no retries: the configured timeout is the sole protection against a
/// hanging upstream.
#[derive(Clone)]
pub struct Fetcher {
    client: &'static Client,
    base_url: String,
}

impl Fetcher {
    pub fn new(cfg: &FetchConfig, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: shared_client(cfg)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a site-relative href against the stats-site base URL.
    pub fn absolute(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            format!("{}/{href}", self.base_url)
        }
    }

    pub fn get_text(&self, url: &str) -> Result<String> {
        self.get_text_with_query(url, &[])
    }

    pub fn get_text_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut req = self.client.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = req.send().with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("http {status}: {url}"));
        }
        Ok(body)
    }

    pub fn get_html(&self, url: &str) -> Result<Html> {
        Ok(Html::parse_document(&self.get_text(url)?))
    }

    pub fn get_html_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<Html> {
        Ok(Html::parse_document(&self.get_text_with_query(url, query)?))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::FetchConfig;

    use super::Fetcher;

    fn fetcher() -> Fetcher {
        let cfg = FetchConfig {
            timeout: Duration::from_secs(5),
            user_agent: "test-agent".to_string(),
        };
        Fetcher::new(&cfg, "https://www.vlr.gg/").expect("client")
    }

    #[test]
    fn absolute_joins_relative_hrefs() {
        let f = fetcher();
        assert_eq!(f.base_url(), "https://www.vlr.gg");
        assert_eq!(f.absolute("/player/1/foo"), "https://www.vlr.gg/player/1/foo");
        assert_eq!(f.absolute("player/1/foo"), "https://www.vlr.gg/player/1/foo");
        assert_eq!(f.absolute("https://other/x"), "https://other/x");
    }
}

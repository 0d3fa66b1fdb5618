use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::ingest::types::FeedSource;
use crate::sentiment::Device;

const DEFAULT_REUTERS_FEED_URL: &str =
    "https://www.reutersagency.com/feed/?best-topics=business-finance&post_type=best";
const DEFAULT_CNBC_FEED_URL: &str = "https://www.cnbc.com/id/100003114/device/rss/rss.html";
const DEFAULT_USER_AGENT: &str = "RealTimeFinancialNewsCrawler/0.1";
const DEFAULT_SENTIMENT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/news.db";
const DEFAULT_OUTPUT_PATH: &str = "output/latest.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

const MIN_HTTP_TIMEOUT_SECS: u64 = 5;
const MAX_HTTP_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration sourced from `CRAWLER_`-prefixed environment
/// variables (with `.env` loaded by main). Every knob has a default.
#[derive(Debug, Clone)]
pub struct Settings {
    pub reuters_feed_url: String,
    pub cnbc_feed_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub sentiment_model: String,
    pub sentiment_device: Device,
    pub database_url: String,
    pub output_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let http_timeout_secs = match env::var("CRAWLER_HTTP_TIMEOUT_SECONDS") {
            Ok(raw) => clamp_timeout(
                raw.parse::<u64>()
                    .with_context(|| format!("invalid CRAWLER_HTTP_TIMEOUT_SECONDS: {raw:?}"))?,
            ),
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        let sentiment_device = env_or("CRAWLER_SENTIMENT_DEVICE", "cpu")
            .parse::<Device>()
            .context("invalid CRAWLER_SENTIMENT_DEVICE")?;

        Ok(Self {
            reuters_feed_url: env_or("CRAWLER_REUTERS_FEED_URL", DEFAULT_REUTERS_FEED_URL),
            cnbc_feed_url: env_or("CRAWLER_CNBC_FEED_URL", DEFAULT_CNBC_FEED_URL),
            http_timeout_secs,
            user_agent: env_or("CRAWLER_USER_AGENT", DEFAULT_USER_AGENT),
            sentiment_model: env_or("CRAWLER_SENTIMENT_MODEL_NAME", DEFAULT_SENTIMENT_MODEL),
            sentiment_device,
            database_url: env_or("CRAWLER_DATABASE_URL", DEFAULT_DATABASE_URL),
            output_path: PathBuf::from(env_or("CRAWLER_OUTPUT_PATH", DEFAULT_OUTPUT_PATH)),
        })
    }

    /// Configured feed sources, in declaration order. Order here decides
    /// output order of the merged batch.
    pub fn sources(&self) -> Vec<FeedSource> {
        vec![
            FeedSource {
                name: "Reuters".to_string(),
                url: self.reuters_feed_url.clone(),
            },
            FeedSource {
                name: "CNBC".to_string(),
                url: self.cnbc_feed_url.clone(),
            },
        ]
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_HTTP_TIMEOUT_SECS, MAX_HTTP_TIMEOUT_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_into_bounds() {
        assert_eq!(clamp_timeout(1), 5);
        assert_eq!(clamp_timeout(5), 5);
        assert_eq!(clamp_timeout(15), 15);
        assert_eq!(clamp_timeout(60), 60);
        assert_eq!(clamp_timeout(3600), 60);
    }

    #[test]
    fn defaults_apply_when_env_is_unset() {
        // test processes don't carry CRAWLER_ vars
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.http_timeout_secs, 15);
        assert_eq!(settings.user_agent, "RealTimeFinancialNewsCrawler/0.1");
        assert_eq!(settings.database_url, "sqlite://data/news.db");
        assert_eq!(settings.output_path, PathBuf::from("output/latest.json"));
        assert_eq!(settings.sentiment_device, Device::Cpu);
        let sources = settings.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "Reuters");
        assert_eq!(sources[1].name, "CNBC");
    }
}

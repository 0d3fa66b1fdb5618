pub mod date;
pub mod dedupe;
pub mod fetch;
pub mod parse;
pub mod types;

use anyhow::Result;
use futures::future::join_all;
use reqwest::Client;
use tracing::{info, warn};

use crate::telemetry::Phase;
use types::{CandidateArticle, FeedSource};

/// Fetch every configured source concurrently and normalize whatever came
/// back. One future per source, each landing in its own result slot; a
/// failed source is logged and contributes zero candidates. Output order
/// is source declaration order, then document order within a payload.
pub async fn collect(client: &Client, sources: &[FeedSource]) -> Vec<CandidateArticle> {
    let payloads = {
        let _s = Phase::Fetch.span().entered();
        join_all(sources.iter().map(|s| fetch::fetch_feed(client, &s.url))).await
    };
    let _s = Phase::Normalize.span().entered();
    merge(sources, payloads)
}

/// Pair each source with its fetch result and normalize the successes.
/// Split out of `collect` so the partial-failure path is testable without
/// a live HTTP server.
pub fn merge(sources: &[FeedSource], payloads: Vec<Result<String>>) -> Vec<CandidateArticle> {
    let mut out = Vec::new();
    for (source, payload) in sources.iter().zip(payloads) {
        match payload {
            Ok(body) => {
                let candidates = parse::normalize(&body, &source.name);
                info!(source = %source.name, candidates = candidates.len(), "feed normalized");
                out.extend(candidates);
            }
            Err(err) => {
                warn!(source = %source.name, url = %source.url, error = %err, "feed fetch failed, skipping source");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn sources() -> Vec<FeedSource> {
        vec![
            FeedSource {
                name: "Reuters".to_string(),
                url: "https://example.com/reuters.xml".to_string(),
            },
            FeedSource {
                name: "CNBC".to_string(),
                url: "https://example.com/cnbc.xml".to_string(),
            },
        ]
    }

    fn feed_with(link: &str) -> String {
        format!(
            "<rss><channel><item><title>T</title><link>{link}</link></item></channel></rss>"
        )
    }

    #[test]
    fn failed_source_contributes_nothing() {
        let payloads = vec![
            Ok(feed_with("https://example.com/a")),
            Err(anyhow!("timed out")),
        ];
        let out = merge(&sources(), payloads);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "Reuters");
    }

    #[test]
    fn output_follows_source_declaration_order() {
        let payloads = vec![
            Ok(feed_with("https://example.com/a")),
            Ok(feed_with("https://example.com/b")),
        ];
        let out = merge(&sources(), payloads);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source, "Reuters");
        assert_eq!(out[1].source, "CNBC");
    }

    #[test]
    fn all_sources_failing_yields_empty_batch() {
        let payloads = vec![Err(anyhow!("dns error")), Err(anyhow!("http 500"))];
        assert!(merge(&sources(), payloads).is_empty());
    }
}

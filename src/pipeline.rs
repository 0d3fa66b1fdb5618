use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::export;
use crate::ingest::{self, dedupe::dedupe, types::CandidateArticle};
use crate::sentiment::{self, Sentiment};
use crate::settings::Settings;
use crate::store;
use crate::telemetry::{self, Phase};

/// The persisted and exported entity: a candidate article with its
/// sentiment flattened in. Created once per run per surviving candidate,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub source: String,
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment_label: String,
    pub sentiment_score: f64,
}

impl ArticleRecord {
    pub fn from_parts(candidate: CandidateArticle, sentiment: Sentiment) -> Self {
        Self {
            source: candidate.source,
            title: candidate.title,
            link: candidate.link,
            summary: candidate.summary,
            published_at: candidate.published_at,
            sentiment_label: sentiment.label,
            sentiment_score: sentiment.score,
        }
    }
}

/// One crawl: fetch + normalize → dedupe → annotate → persist → export.
/// Per-source and per-item problems were already absorbed upstream; any
/// error surfacing here fails the whole run.
pub async fn run(settings: &Settings) -> Result<Vec<ArticleRecord>> {
    let root = telemetry::root_span();
    let _g = root.entered();

    let client = ingest::fetch::build_client(settings)?;
    let sources = settings.sources();
    let candidates = ingest::collect(&client, &sources).await;

    let deduped = {
        let _s = Phase::Dedupe.span().entered();
        let before = candidates.len();
        let deduped = dedupe(candidates);
        info!(before, after = deduped.len(), "deduplicated batch");
        deduped
    };

    let sentiments = {
        let _s = Phase::Annotate.span().entered();
        let titles: Vec<String> = deduped.iter().map(|c| c.title.clone()).collect();
        sentiment::annotate(&settings.sentiment_model, settings.sentiment_device, &titles)
            .context("sentiment annotation failed")?
    };
    ensure!(
        sentiments.len() == deduped.len(),
        "annotation returned {} results for {} titles",
        sentiments.len(),
        deduped.len()
    );

    let records: Vec<ArticleRecord> = deduped
        .into_iter()
        .zip(sentiments)
        .map(|(candidate, sentiment)| ArticleRecord::from_parts(candidate, sentiment))
        .collect();

    {
        let _s = Phase::Persist.span().entered();
        let pool = store::connect(&settings.database_url)
            .await
            .context("open article store")?;
        let inserted = store::insert_articles(&pool, &records)
            .await
            .context("persist batch")?;
        pool.close().await;
        info!(inserted, total = records.len(), "persisted batch");
    }

    {
        let _s = Phase::Export.span().entered();
        export::write_json(&settings.output_path, &records).context("export batch")?;
        info!(path = %settings.output_path.display(), "exported batch");
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_flattens_candidate_and_sentiment() {
        let candidate = CandidateArticle {
            source: "Reuters".to_string(),
            title: "Stocks rally".to_string(),
            link: "https://example.com/a".to_string(),
            summary: Some("summary".to_string()),
            published_at: None,
        };
        let sentiment = Sentiment {
            label: "POSITIVE".to_string(),
            score: 0.97,
        };
        let record = ArticleRecord::from_parts(candidate, sentiment);
        assert_eq!(record.source, "Reuters");
        assert_eq!(record.sentiment_label, "POSITIVE");
        assert!((record.sentiment_score - 0.97).abs() < 1e-9);
    }

    #[test]
    fn record_serializes_with_flat_field_names() {
        let record = ArticleRecord {
            source: "CNBC".to_string(),
            title: "Markets fall".to_string(),
            link: "https://example.com/b".to_string(),
            summary: None,
            published_at: None,
            sentiment_label: "NEGATIVE".to_string(),
            sentiment_score: 0.88,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["link"], "https://example.com/b");
        assert_eq!(json["sentiment_label"], "NEGATIVE");
        assert!(json["summary"].is_null());
        assert!(json["published_at"].is_null());
    }
}

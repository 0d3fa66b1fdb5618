use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named feed origin providing one payload per run.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// An article extracted from a feed payload, before sentiment annotation
/// or persistence. `title` is non-empty and `link` is a parseable absolute
/// URL for every candidate the normalizer emits; `published_at` of `None`
/// means "unknown publish time", not epoch or now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateArticle {
    pub source: String,
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

pub mod config;

use tracing::{Span, info_span};

/// Stages of a crawl run, each with its own span so per-phase timing and
/// nesting show up in the logs.
#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Fetch,
    Normalize,
    Dedupe,
    Annotate,
    Persist,
    Export,
}

impl Phase {
    pub fn span(&self) -> Span {
        match self {
            Phase::Fetch => info_span!("fetch"),
            Phase::Normalize => info_span!("normalize"),
            Phase::Dedupe => info_span!("dedupe"),
            Phase::Annotate => info_span!("annotate"),
            Phase::Persist => info_span!("persist"),
            Phase::Export => info_span!("export"),
        }
    }
}

pub fn root_span() -> Span {
    info_span!("crawl")
}

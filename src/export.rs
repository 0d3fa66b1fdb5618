use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::pipeline::ArticleRecord;

/// Serialize the full batch as pretty JSON, creating parent directories
/// as needed and overwriting any previous export.
pub fn write_json(path: &Path, records: &[ArticleRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create export directory {parent:?}"))?;
        }
    }
    let file = fs::File::create(path).with_context(|| format!("create export file {path:?}"))?;
    serde_json::to_writer_pretty(file, records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(link: &str) -> ArticleRecord {
        ArticleRecord {
            source: "Reuters".to_string(),
            title: "Stocks rally".to_string(),
            link: link.to_string(),
            summary: None,
            published_at: None,
            sentiment_label: "POSITIVE".to_string(),
            sentiment_score: 0.9,
        }
    }

    #[test]
    fn writes_batch_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/output/latest.json");
        write_json(&path, &[record("https://example.com/a")]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Vec<ArticleRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].link, "https://example.com/a");
    }

    #[test]
    fn overwrites_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        write_json(&path, &[record("https://example.com/a"), record("https://example.com/b")])
            .unwrap();
        write_json(&path, &[record("https://example.com/c")]).unwrap();

        let parsed: Vec<ArticleRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].link, "https://example.com/c");
    }

    #[test]
    fn empty_batch_exports_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        write_json(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}

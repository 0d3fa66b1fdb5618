use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::pipeline::ArticleRecord;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source          TEXT NOT NULL,
    title           TEXT NOT NULL,
    link            TEXT NOT NULL UNIQUE,
    summary         TEXT,
    published_at    TEXT,
    sentiment_label TEXT NOT NULL,
    sentiment_score REAL NOT NULL
)
"#;

/// Open the article store, creating the database file (and its parent
/// directory) and the schema when missing. The pool lives for one run;
/// the caller closes it after the batch commit.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    if let Some(path) = database_url.strip_prefix("sqlite://") {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create database directory {parent:?}"))?;
                }
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid database url {database_url:?}"))?
        .create_if_missing(true);
    // single batch writer per run; one connection also keeps
    // `sqlite::memory:` pointing at a single database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query(SCHEMA).execute(&pool).await?;
    Ok(pool)
}

/// Insert-if-absent by link: rows whose link already exists are left
/// untouched, stale metadata included. One transaction, one commit at the
/// end of the batch. Returns the number of newly inserted rows.
pub async fn insert_articles(pool: &SqlitePool, records: &[ArticleRecord]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;
    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO articles
                (source, title, link, summary, published_at, sentiment_label, sentiment_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(&record.source)
        .bind(&record.title)
        .bind(&record.link)
        .bind(&record.summary)
        .bind(record.published_at)
        .bind(&record.sentiment_label)
        .bind(record.sentiment_score)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(source: &str, link: &str, label: &str) -> ArticleRecord {
        ArticleRecord {
            source: source.to_string(),
            title: "Stocks rally".to_string(),
            link: link.to_string(),
            summary: Some("a summary".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2024, 10, 2, 15, 4, 5).unwrap()),
            sentiment_label: label.to_string(),
            sentiment_score: 0.98,
        }
    }

    #[tokio::test]
    async fn inserts_new_rows_and_reports_count() {
        let pool = connect("sqlite::memory:").await.unwrap();
        let batch = vec![
            record("Reuters", "https://example.com/a", "POSITIVE"),
            record("CNBC", "https://example.com/b", "NEGATIVE"),
        ];
        let inserted = insert_articles(&pool, &batch).await.unwrap();
        assert_eq!(inserted, 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn existing_links_are_left_untouched() {
        let pool = connect("sqlite::memory:").await.unwrap();
        insert_articles(&pool, &[record("Reuters", "https://example.com/a", "POSITIVE")])
            .await
            .unwrap();

        // same link, different content: must not replace the original row
        let inserted = insert_articles(
            &pool,
            &[record("CNBC", "https://example.com/a", "NEGATIVE")],
        )
        .await
        .unwrap();
        assert_eq!(inserted, 0);

        let (source, label): (String, String) =
            sqlx::query_as("SELECT source, sentiment_label FROM articles WHERE link = ?1")
                .bind("https://example.com/a")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(source, "Reuters");
        assert_eq!(label, "POSITIVE");
        pool.close().await;
    }

    #[tokio::test]
    async fn nullable_fields_round_trip() {
        let pool = connect("sqlite::memory:").await.unwrap();
        let mut rec = record("Reuters", "https://example.com/n", "POSITIVE");
        rec.summary = None;
        rec.published_at = None;
        insert_articles(&pool, &[rec]).await.unwrap();

        let (summary, published_at): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT summary, published_at FROM articles WHERE link = ?1")
                .bind("https://example.com/n")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(summary, None);
        assert_eq!(published_at, None);
        pool.close().await;
    }
}

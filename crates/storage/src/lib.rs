//! SQLite sink: the `SQL` half of the dual-sink persister. Feeds, posts and
//! links upsert on their natural keys; category/language cross-tables are
//! insert-or-ignore. `cleanup_no_index` runs once at shutdown.

pub mod hugo;

use feedmesh_core::{CrawlError, Feed, Link, Post};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self, CrawlError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CrawlError> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        info!("storage migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Upsert a Feed, keyed by `feed_link`. Conflicts update the mutable
    /// fields and leave the row's identity intact; category/language rows
    /// are insert-or-ignore.
    pub async fn store_feed(&self, feed: &Feed) -> Result<(), CrawlError> {
        sqlx::query(
            "INSERT INTO feeds (feed_id, feed_link, title, description, date, feed_type, \
             is_podcast, is_no_archive, link, post_count, avg_post_length, avg_posts_per_day) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(feed_link) DO UPDATE SET \
             date = excluded.date, description = excluded.description, title = excluded.title, \
             is_podcast = excluded.is_podcast, is_no_archive = excluded.is_no_archive, \
             post_count = excluded.post_count, avg_post_length = excluded.avg_post_length, \
             avg_posts_per_day = excluded.avg_posts_per_day",
        )
        .bind(&feed.id)
        .bind(&feed.feed_link)
        .bind(&feed.title)
        .bind(&feed.description)
        .bind(&feed.date)
        .bind(feed.feed_type.as_str())
        .bind(feed.is_podcast)
        .bind(feed.is_no_archive)
        .bind(&feed.link)
        .bind(feed.post_count as i64)
        .bind(feed.avg_post_length as i64)
        .bind(feed.avg_posts_per_day)
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlError::Storage(e.to_string()))?;

        for category in &feed.categories {
            sqlx::query("INSERT OR IGNORE INTO feeds_by_category (category, link) VALUES (?, ?)")
                .bind(category)
                .bind(&feed.feed_link)
                .execute(&self.pool)
                .await
                .map_err(|e| CrawlError::Storage(e.to_string()))?;
        }
        if let Some(language) = &feed.language {
            sqlx::query("INSERT OR IGNORE INTO feeds_by_language (language, link) VALUES (?, ?)")
                .bind(language)
                .bind(&feed.feed_link)
                .execute(&self.pool)
                .await
                .map_err(|e| CrawlError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// Upsert a Post, keyed by `guid`.
    pub async fn store_post(&self, post: &Post) -> Result<(), CrawlError> {
        sqlx::query(
            "INSERT INTO posts (post_id, feed_id, feed_link, title, description, content, date, guid, link) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(guid) DO UPDATE SET \
             date = excluded.date, description = excluded.description, title = excluded.title, link = excluded.link",
        )
        .bind(&post.id)
        .bind(&post.feed_id)
        .bind(&post.feed_link)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.content)
        .bind(&post.date)
        .bind(&post.id)
        .bind(&post.link)
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlError::Storage(e.to_string()))?;

        for category in &post.categories {
            sqlx::query("INSERT OR IGNORE INTO posts_by_category (category, link) VALUES (?, ?)")
                .bind(category)
                .bind(&post.link)
                .execute(&self.pool)
                .await
                .map_err(|e| CrawlError::Storage(e.to_string()))?;
        }
        if let Some(language) = &post.language {
            sqlx::query("INSERT OR IGNORE INTO posts_by_language (language, link) VALUES (?, ?)")
                .bind(language)
                .bind(&post.link)
                .execute(&self.pool)
                .await
                .map_err(|e| CrawlError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// Insert a Link on its composite natural key; conflicts are no-ops
    /// (a recommendation fact doesn't change once recorded).
    pub async fn store_link(&self, link: &Link) -> Result<(), CrawlError> {
        sqlx::query(
            "INSERT OR IGNORE INTO links (source_type, source_url, destination_type, destination_url, link_type) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(link.source_type.as_str())
        .bind(&link.source_url)
        .bind(link.dest_type.as_str())
        .bind(&link.dest_url)
        .bind(link.link_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete every Link whose source or destination URL is in `no_index_urls`.
    /// Called once at shutdown; the no-index set itself lives in
    /// `feedmesh-frontier::LinkGraph` and is dropped by the caller afterward.
    pub async fn cleanup_no_index(&self, no_index_urls: &[String]) -> Result<u64, CrawlError> {
        if no_index_urls.is_empty() {
            return Ok(0);
        }
        let placeholders = no_index_urls.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "DELETE FROM links WHERE source_url IN ({placeholders}) OR destination_url IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for url in no_index_urls {
            query = query.bind(url);
        }
        for url in no_index_urls {
            query = query.bind(url);
        }
        let result = query.execute(&self.pool).await.map_err(|e| CrawlError::Storage(e.to_string()))?;
        info!(deleted = result.rows_affected(), "no-index links cleaned up");
        Ok(result.rows_affected())
    }

    pub async fn get_feed_count(&self) -> Result<i64, CrawlError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(row.0)
    }

    pub async fn get_post_count(&self) -> Result<i64, CrawlError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(row.0)
    }

    pub async fn get_link_count(&self) -> Result<i64, CrawlError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM links")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(row.0)
    }
}

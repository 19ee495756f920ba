//! `Request` persistence and the tag-index/tombstone contracts (§4.7).

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Store;
use crate::domain::quality::{auto_tombstone, matching_auto_tombstone_tag};
use crate::domain::request::{derive_effective_date, Request, SourceType};
use crate::error::Result;

/// Parameters for inserting a new `Request` (§4.3 steps 4 and 7, and the direct text-ingest path).
pub struct NewRequest {
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub scraper_uuid: Option<String>,
    pub analyzer_job_id: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Value,
    pub slug: Option<String>,
    pub seo_enabled: bool,
}

pub struct RequestOps<'a> {
    store: &'a Store,
}

impl<'a> RequestOps<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new Request, deriving `effective_date` once at save time and populating the tag
    /// index transactionally alongside the row itself (§4.7 SaveRequest).
    pub async fn save(&self, new_request: NewRequest) -> Result<Request> {
        let created_at = Utc::now();
        let effective_date = derive_effective_date(&new_request.metadata, created_at);

        let mut tx = self.store.pool().begin().await?;

        let request = sqlx::query_as::<_, Request>(
            "INSERT INTO requests \
                (created_at, effective_date, source_type, source_url, scraper_uuid, \
                 analyzer_job_id, tags, metadata, slug, seo_enabled) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING *",
        )
        .bind(created_at)
        .bind(effective_date)
        .bind(new_request.source_type)
        .bind(&new_request.source_url)
        .bind(&new_request.scraper_uuid)
        .bind(&new_request.analyzer_job_id)
        .bind(sqlx::types::Json(&new_request.tags))
        .bind(sqlx::types::Json(&new_request.metadata))
        .bind(&new_request.slug)
        .bind(new_request.seo_enabled)
        .fetch_one(&mut *tx)
        .await?;

        write_tag_index(&mut tx, request.id, &request.tags).await?;

        tx.commit().await?;
        Ok(request)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Request>> {
        let request = sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?;
        Ok(request)
    }

    /// Replace the tag set atomically, rewrite the tag index, and apply the configured
    /// auto-tombstone policy if any of `new_tags` is a case-sensitive match (§4.7
    /// UpdateRequestTags).
    pub async fn update_tags(&self, id: i64, new_tags: Vec<String>) -> Result<()> {
        let mut tx = self.store.pool().begin().await?;

        sqlx::query("UPDATE requests SET tags = $2 WHERE id = $1")
            .bind(id)
            .bind(sqlx::types::Json(&new_tags))
            .execute(&mut *tx)
            .await?;

        write_tag_index(&mut tx, id, &new_tags).await?;

        if let Some(matched) = matching_auto_tombstone_tag(&new_tags, &self.store.tombstone_tags) {
            let decision = auto_tombstone(Utc::now(), self.store.tombstone_periods.tag_days, matched);
            apply_tombstone_in_tx(&mut tx, id, &decision.tombstone_datetime, &decision.reason).await?;
            sqlx::query("UPDATE requests SET seo_enabled = $2 WHERE id = $1")
                .bind(id)
                .bind(decision.seo_enabled)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace the metadata tree wholesale, after the caller has merged changes in memory
    /// (§4.7 UpdateRequestMetadata).
    pub async fn update_metadata(&self, id: i64, metadata: Value) -> Result<()> {
        sqlx::query("UPDATE requests SET metadata = $2 WHERE id = $1")
            .bind(id)
            .bind(sqlx::types::Json(metadata))
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    pub async fn update_seo_enabled(&self, id: i64, seo_enabled: bool) -> Result<()> {
        sqlx::query("UPDATE requests SET seo_enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(seo_enabled)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    /// Merge tombstone fields into `metadata` and update `seo_enabled` in one logical operation
    /// (used by `ScrapeHandler`'s below-threshold path and `RetrieveAnalysisHandler`'s two-tier
    /// tombstone — both already hold the merged metadata in memory).
    pub async fn apply_tombstone(
        &self,
        id: i64,
        tombstone_datetime: DateTime<Utc>,
        reason: &str,
        seo_enabled: bool,
    ) -> Result<()> {
        let mut tx = self.store.pool().begin().await?;
        apply_tombstone_in_tx(&mut tx, id, &tombstone_datetime, reason).await?;
        sqlx::query("UPDATE requests SET seo_enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(seo_enabled)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// `min(effective_date)` across all requests, or `None` if the table is empty.
    pub async fn get_timeline_extents(&self) -> Result<Option<DateTime<Utc>>> {
        let (min,): (Option<DateTime<Utc>>,) =
            sqlx::query_as("SELECT MIN(effective_date) FROM requests")
                .fetch_one(self.store.pool())
                .await?;
        Ok(min)
    }
}

async fn write_tag_index(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request_id: i64,
    tags: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM request_tags WHERE request_id = $1")
        .bind(request_id)
        .execute(&mut **tx)
        .await?;

    if !tags.is_empty() {
        sqlx::query(
            "INSERT INTO request_tags (request_id, tag) \
             SELECT $1, t FROM UNNEST($2::text[]) AS t",
        )
        .bind(request_id)
        .bind(tags)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn apply_tombstone_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request_id: i64,
    tombstone_datetime: &DateTime<Utc>,
    reason: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE requests SET metadata = jsonb_set( \
             jsonb_set(metadata, '{tombstone_datetime}', to_jsonb($2::text)), \
             '{tombstone_reason}', to_jsonb($3::text)) \
         WHERE id = $1",
    )
    .bind(request_id)
    .bind(tombstone_datetime.to_rfc3339())
    .bind(reason)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

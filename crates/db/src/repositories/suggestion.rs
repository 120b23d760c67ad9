use chrono::Utc;
use sqlx::Row;

use planpal_core::domain::group::GroupId;
use planpal_core::domain::suggestion::{
    NewSuggestion, Suggestion, SuggestionId, SuggestionKind, SuggestionMetadata,
};

use super::{decode_error, parse_timestamp, RepositoryError, SuggestionRepository};
use crate::DbPool;

pub struct SqlSuggestionRepository {
    pool: DbPool,
}

impl SqlSuggestionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Decodes `metadata_json` into the variant named by the `kind` column.
fn decode_metadata(kind: &str, raw: &str) -> Result<SuggestionMetadata, RepositoryError> {
    let kind = SuggestionKind::parse(kind)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown suggestion kind `{kind}`")))?;
    let metadata = match kind {
        SuggestionKind::Place => {
            SuggestionMetadata::Place(serde_json::from_str(raw).map_err(decode_error)?)
        }
        SuggestionKind::Movie => {
            SuggestionMetadata::Movie(serde_json::from_str(raw).map_err(decode_error)?)
        }
        SuggestionKind::Experience => {
            SuggestionMetadata::Experience(serde_json::from_str(raw).map_err(decode_error)?)
        }
    };
    Ok(metadata)
}

fn row_to_suggestion(row: &sqlx::sqlite::SqliteRow) -> Result<Suggestion, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let group_id: i64 = row.try_get("group_id").map_err(decode_error)?;
    let kind: String = row.try_get("kind").map_err(decode_error)?;
    let source_id: Option<String> = row.try_get("source_id").map_err(decode_error)?;
    let title: String = row.try_get("title").map_err(decode_error)?;
    let description: String = row.try_get("description").map_err(decode_error)?;
    let rating: Option<f64> = row.try_get("rating").map_err(decode_error)?;
    let price_estimate: Option<i64> = row.try_get("price_estimate").map_err(decode_error)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Suggestion {
        id: SuggestionId(id),
        group_id: GroupId(group_id),
        source_id,
        title,
        description,
        rating,
        price_estimate,
        metadata: decode_metadata(&kind, &metadata_json)?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl SuggestionRepository for SqlSuggestionRepository {
    async fn insert_batch(
        &self,
        group_id: GroupId,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut persisted = Vec::with_capacity(suggestions.len());

        for suggestion in suggestions {
            let metadata_json =
                serde_json::to_string(&suggestion.metadata).map_err(decode_error)?;
            let result = sqlx::query(
                "INSERT INTO suggestion
                    (group_id, kind, source_id, title, description, rating, price_estimate,
                     metadata_json, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(group_id.0)
            .bind(suggestion.kind().as_str())
            .bind(&suggestion.source_id)
            .bind(&suggestion.title)
            .bind(&suggestion.description)
            .bind(suggestion.rating)
            .bind(suggestion.price_estimate)
            .bind(&metadata_json)
            .bind(created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            persisted.push(Suggestion {
                id: SuggestionId(result.last_insert_rowid()),
                group_id,
                source_id: suggestion.source_id,
                title: suggestion.title,
                description: suggestion.description,
                rating: suggestion.rating,
                price_estimate: suggestion.price_estimate,
                metadata: suggestion.metadata,
                created_at,
            });
        }

        tx.commit().await?;
        Ok(persisted)
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, group_id, kind, source_id, title, description, rating, price_estimate,
                    metadata_json, created_at
             FROM suggestion WHERE group_id = ? ORDER BY id ASC",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_suggestion).collect()
    }
}

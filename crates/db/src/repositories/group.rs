use chrono::Utc;
use sqlx::Row;

use planpal_core::domain::group::{BudgetLevel, Group, GroupCode, GroupId, Mood, NewGroup};

use super::{decode_error, parse_timestamp, GroupRepository, RepositoryError};
use crate::DbPool;

const GROUP_COLUMNS: &str = "id, code, name, mood, budget_level, created_at";

pub struct SqlGroupRepository {
    pool: DbPool,
}

impl SqlGroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<Group, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let code: String = row.try_get("code").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let mood: Option<String> = row.try_get("mood").map_err(decode_error)?;
    let budget_level: Option<String> = row.try_get("budget_level").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Group {
        id: GroupId(id),
        code: GroupCode::parse(&code).map_err(decode_error)?,
        name,
        mood: mood.as_deref().map(Mood::parse),
        budget_level: budget_level.as_deref().map(BudgetLevel::parse),
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl GroupRepository for SqlGroupRepository {
    async fn create(&self, group: NewGroup) -> Result<Group, RepositoryError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO planning_group (code, name, mood, budget_level, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(group.code.as_str())
        .bind(&group.name)
        .bind(group.mood.as_ref().map(Mood::as_str))
        .bind(group.budget_level.as_ref().map(BudgetLevel::as_str))
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::from_write(error, &format!("group {}", group.code)))?;

        Ok(Group {
            id: GroupId(result.last_insert_rowid()),
            code: group.code,
            name: group.name,
            mood: group.mood,
            budget_level: group.budget_level,
            created_at,
        })
    }

    async fn find_by_code(&self, code: &GroupCode) -> Result<Option<Group>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM planning_group WHERE code = ?"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_group).transpose()
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM planning_group WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_group).transpose()
    }
}

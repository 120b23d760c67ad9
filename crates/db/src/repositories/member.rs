use chrono::Utc;
use sqlx::Row;

use planpal_core::domain::group::GroupId;
use planpal_core::domain::member::{Member, MemberId, NewMember};
use planpal_core::geo::Coordinates;

use super::{decode_error, parse_timestamp, MemberRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMemberRepository {
    pool: DbPool,
}

impl SqlMemberRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_member(row: &sqlx::sqlite::SqliteRow) -> Result<Member, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let group_id: i64 = row.try_get("group_id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let avatar_url: Option<String> = row.try_get("avatar_url").map_err(decode_error)?;
    let lat: Option<f64> = row.try_get("location_lat").map_err(decode_error)?;
    let lng: Option<f64> = row.try_get("location_lng").map_err(decode_error)?;
    let joined_at: String = row.try_get("joined_at").map_err(decode_error)?;

    let location = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    };

    Ok(Member {
        id: MemberId(id),
        group_id: GroupId(group_id),
        name,
        avatar_url,
        location,
        joined_at: parse_timestamp("joined_at", &joined_at)?,
    })
}

#[async_trait::async_trait]
impl MemberRepository for SqlMemberRepository {
    async fn add(&self, group_id: GroupId, member: NewMember) -> Result<Member, RepositoryError> {
        let joined_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO group_member (group_id, name, avatar_url, location_lat, location_lng, joined_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(group_id.0)
        .bind(&member.name)
        .bind(&member.avatar_url)
        .bind(member.location.map(|location| location.lat))
        .bind(member.location.map(|location| location.lng))
        .bind(joined_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Member {
            id: MemberId(result.last_insert_rowid()),
            group_id,
            name: member.name,
            avatar_url: member.avatar_url,
            location: member.location,
            joined_at,
        })
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<Member>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, group_id, name, avatar_url, location_lat, location_lng, joined_at
             FROM group_member WHERE group_id = ? ORDER BY id ASC",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_member).collect()
    }
}

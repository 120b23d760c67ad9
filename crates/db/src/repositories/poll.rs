use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sqlx::Row;

use planpal_core::domain::group::GroupId;
use planpal_core::domain::member::MemberId;
use planpal_core::domain::poll::{NewPoll, NewVote, Poll, PollId, PollOption, VoteEntry};

use super::{decode_error, parse_timestamp, PollRepository, RepositoryError};
use crate::DbPool;

type VoteLedger = BTreeMap<String, Vec<VoteEntry>>;

/// Polls keep their options inline as JSON; each vote is its own `poll_vote`
/// row so concurrent voters only ever insert.
pub struct SqlPollRepository {
    pool: DbPool,
}

impl SqlPollRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_votes(
        &self,
        filter_sql: &str,
        key: i64,
    ) -> Result<HashMap<i64, VoteLedger>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT v.poll_id, v.option_id, v.member_id, v.emoji
             FROM poll_vote v JOIN poll p ON p.id = v.poll_id
             WHERE {filter_sql} = ?
             ORDER BY v.id ASC"
        ))
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        let mut ledgers: HashMap<i64, VoteLedger> = HashMap::new();
        for row in &rows {
            let poll_id: i64 = row.try_get("poll_id").map_err(decode_error)?;
            let option_id: String = row.try_get("option_id").map_err(decode_error)?;
            let member_id: i64 = row.try_get("member_id").map_err(decode_error)?;
            let emoji: String = row.try_get("emoji").map_err(decode_error)?;

            ledgers
                .entry(poll_id)
                .or_default()
                .entry(option_id)
                .or_default()
                .push(VoteEntry { member_id: MemberId(member_id), emoji });
        }
        Ok(ledgers)
    }
}

fn row_to_poll(row: &sqlx::sqlite::SqliteRow, votes: VoteLedger) -> Result<Poll, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let group_id: i64 = row.try_get("group_id").map_err(decode_error)?;
    let title: String = row.try_get("title").map_err(decode_error)?;
    let options_json: String = row.try_get("options_json").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    let options: Vec<PollOption> = serde_json::from_str(&options_json).map_err(decode_error)?;

    Ok(Poll {
        id: PollId(id),
        group_id: GroupId(group_id),
        title,
        options,
        votes,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl PollRepository for SqlPollRepository {
    async fn create(&self, group_id: GroupId, poll: NewPoll) -> Result<Poll, RepositoryError> {
        let created_at = Utc::now();
        let options_json = serde_json::to_string(&poll.options).map_err(decode_error)?;

        let result = sqlx::query(
            "INSERT INTO poll (group_id, title, options_json, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(group_id.0)
        .bind(&poll.title)
        .bind(&options_json)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Poll {
            id: PollId(result.last_insert_rowid()),
            group_id,
            title: poll.title,
            options: poll.options,
            votes: BTreeMap::new(),
            created_at,
        })
    }

    async fn find(
        &self,
        group_id: GroupId,
        poll_id: PollId,
    ) -> Result<Option<Poll>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, group_id, title, options_json, created_at
             FROM poll WHERE id = ? AND group_id = ?",
        )
        .bind(poll_id.0)
        .bind(group_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut ledgers = self.load_votes("v.poll_id", poll_id.0).await?;
        let votes = ledgers.remove(&poll_id.0).unwrap_or_default();
        row_to_poll(&row, votes).map(Some)
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<Poll>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, group_id, title, options_json, created_at
             FROM poll WHERE group_id = ? ORDER BY id ASC",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut ledgers = self.load_votes("p.group_id", group_id.0).await?;
        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(decode_error)?;
                row_to_poll(row, ledgers.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn append_vote(&self, poll_id: PollId, vote: NewVote) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO poll_vote (poll_id, option_id, member_id, emoji, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(poll_id.0)
        .bind(&vote.option_id)
        .bind(vote.member_id.0)
        .bind(&vote.emoji)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

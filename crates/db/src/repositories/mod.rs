use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use planpal_core::domain::chat::{ChatMessage, NewChatMessage};
use planpal_core::domain::group::{Group, GroupCode, GroupId, NewGroup};
use planpal_core::domain::member::{Member, NewMember};
use planpal_core::domain::poll::{NewPoll, NewVote, Poll, PollId};
use planpal_core::domain::suggestion::{NewSuggestion, Suggestion};

use crate::DbPool;

pub mod chat;
pub mod group;
pub mod member;
pub mod memory;
pub mod poll;
pub mod suggestion;

pub use chat::SqlChatRepository;
pub use group::SqlGroupRepository;
pub use member::SqlMemberRepository;
pub use memory::{
    InMemoryChatRepository, InMemoryGroupRepository, InMemoryMemberRepository,
    InMemoryPollRepository, InMemorySuggestionRepository,
};
pub use poll::SqlPollRepository;
pub use suggestion::SqlSuggestionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl RepositoryError {
    /// Maps a unique-constraint violation to [`RepositoryError::Conflict`].
    pub(crate) fn from_write(error: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(database_error) = &error {
            if database_error.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
        }
        Self::Database(error)
    }
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the code is taken.
    async fn create(&self, group: NewGroup) -> Result<Group, RepositoryError>;
    async fn find_by_code(&self, code: &GroupCode) -> Result<Option<Group>, RepositoryError>;
    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError>;
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn add(&self, group_id: GroupId, member: NewMember) -> Result<Member, RepositoryError>;
    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<Member>, RepositoryError>;
}

#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    /// Persists the whole batch or nothing.
    async fn insert_batch(
        &self,
        group_id: GroupId,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, RepositoryError>;

    async fn list_for_group(&self, group_id: GroupId)
        -> Result<Vec<Suggestion>, RepositoryError>;
}

#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn create(&self, group_id: GroupId, poll: NewPoll) -> Result<Poll, RepositoryError>;
    async fn find(&self, group_id: GroupId, poll_id: PollId)
        -> Result<Option<Poll>, RepositoryError>;
    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<Poll>, RepositoryError>;

    /// Appends one ledger entry. Never rewrites earlier entries.
    async fn append_vote(&self, poll_id: PollId, vote: NewVote) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn append(
        &self,
        group_id: GroupId,
        message: NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError>;

    async fn list_for_group(&self, group_id: GroupId)
        -> Result<Vec<ChatMessage>, RepositoryError>;
}

/// Every store the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub groups: Arc<dyn GroupRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub suggestions: Arc<dyn SuggestionRepository>,
    pub polls: Arc<dyn PollRepository>,
    pub chat: Arc<dyn ChatRepository>,
}

impl Repositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            groups: Arc::new(SqlGroupRepository::new(pool.clone())),
            members: Arc::new(SqlMemberRepository::new(pool.clone())),
            suggestions: Arc::new(SqlSuggestionRepository::new(pool.clone())),
            polls: Arc::new(SqlPollRepository::new(pool.clone())),
            chat: Arc::new(SqlChatRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            groups: Arc::new(InMemoryGroupRepository::default()),
            members: Arc::new(InMemoryMemberRepository::default()),
            suggestions: Arc::new(InMemorySuggestionRepository::default()),
            polls: Arc::new(InMemoryPollRepository::default()),
            chat: Arc::new(InMemoryChatRepository::default()),
        }
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid {column} `{value}`: {error}")))
}

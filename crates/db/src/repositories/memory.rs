use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use planpal_core::domain::chat::{ChatMessage, ChatMessageId, NewChatMessage};
use planpal_core::domain::group::{Group, GroupCode, GroupId, NewGroup};
use planpal_core::domain::member::{Member, MemberId, NewMember};
use planpal_core::domain::poll::{NewPoll, NewVote, Poll, PollId, VoteEntry};
use planpal_core::domain::suggestion::{NewSuggestion, Suggestion, SuggestionId};

use super::{
    ChatRepository, GroupRepository, MemberRepository, PollRepository, RepositoryError,
    SuggestionRepository,
};

/// Row-id style sequence starting at 1.
#[derive(Default)]
struct Sequence(AtomicI64);

impl Sequence {
    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Default)]
pub struct InMemoryGroupRepository {
    ids: Sequence,
    groups: RwLock<HashMap<GroupId, Group>>,
}

#[async_trait::async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create(&self, group: NewGroup) -> Result<Group, RepositoryError> {
        let mut groups = self.groups.write().await;
        if groups.values().any(|existing| existing.code == group.code) {
            return Err(RepositoryError::Conflict(format!("group {} already exists", group.code)));
        }

        let created = Group {
            id: GroupId(self.ids.next()),
            code: group.code,
            name: group.name,
            mood: group.mood,
            budget_level: group.budget_level,
            created_at: Utc::now(),
        };
        groups.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_code(&self, code: &GroupCode) -> Result<Option<Group>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.values().find(|group| &group.code == code).cloned())
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryMemberRepository {
    ids: Sequence,
    members: RwLock<BTreeMap<MemberId, Member>>,
}

#[async_trait::async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn add(&self, group_id: GroupId, member: NewMember) -> Result<Member, RepositoryError> {
        let mut members = self.members.write().await;
        let created = Member {
            id: MemberId(self.ids.next()),
            group_id,
            name: member.name,
            avatar_url: member.avatar_url,
            location: member.location,
            joined_at: Utc::now(),
        };
        members.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<Member>, RepositoryError> {
        let members = self.members.read().await;
        Ok(members.values().filter(|member| member.group_id == group_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemorySuggestionRepository {
    ids: Sequence,
    suggestions: RwLock<BTreeMap<SuggestionId, Suggestion>>,
}

#[async_trait::async_trait]
impl SuggestionRepository for InMemorySuggestionRepository {
    async fn insert_batch(
        &self,
        group_id: GroupId,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let created_at = Utc::now();
        let mut stored = self.suggestions.write().await;

        let persisted = suggestions
            .into_iter()
            .map(|suggestion| Suggestion {
                id: SuggestionId(self.ids.next()),
                group_id,
                source_id: suggestion.source_id,
                title: suggestion.title,
                description: suggestion.description,
                rating: suggestion.rating,
                price_estimate: suggestion.price_estimate,
                metadata: suggestion.metadata,
                created_at,
            })
            .collect::<Vec<_>>();

        for suggestion in &persisted {
            stored.insert(suggestion.id, suggestion.clone());
        }
        Ok(persisted)
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let suggestions = self.suggestions.read().await;
        Ok(suggestions
            .values()
            .filter(|suggestion| suggestion.group_id == group_id)
            .cloned()
            .collect())
    }
}

/// Votes are appended while holding the write lock, so no entry is lost.
#[derive(Default)]
pub struct InMemoryPollRepository {
    ids: Sequence,
    polls: RwLock<BTreeMap<PollId, Poll>>,
}

#[async_trait::async_trait]
impl PollRepository for InMemoryPollRepository {
    async fn create(&self, group_id: GroupId, poll: NewPoll) -> Result<Poll, RepositoryError> {
        let mut polls = self.polls.write().await;
        let created = Poll {
            id: PollId(self.ids.next()),
            group_id,
            title: poll.title,
            options: poll.options,
            votes: BTreeMap::new(),
            created_at: Utc::now(),
        };
        polls.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find(
        &self,
        group_id: GroupId,
        poll_id: PollId,
    ) -> Result<Option<Poll>, RepositoryError> {
        let polls = self.polls.read().await;
        Ok(polls.get(&poll_id).filter(|poll| poll.group_id == group_id).cloned())
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<Poll>, RepositoryError> {
        let polls = self.polls.read().await;
        Ok(polls.values().filter(|poll| poll.group_id == group_id).cloned().collect())
    }

    async fn append_vote(&self, poll_id: PollId, vote: NewVote) -> Result<(), RepositoryError> {
        let mut polls = self.polls.write().await;
        let poll = polls
            .get_mut(&poll_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("poll {poll_id}")))?;
        let entry = VoteEntry { member_id: vote.member_id, emoji: vote.emoji };
        poll.record_vote(vote.option_id, entry);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryChatRepository {
    ids: Sequence,
    messages: RwLock<Vec<ChatMessage>>,
}

#[async_trait::async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn append(
        &self,
        group_id: GroupId,
        message: NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.write().await;
        let created = ChatMessage {
            id: ChatMessageId(self.ids.next()),
            group_id,
            member_id: message.member_id,
            message: message.message,
            created_at: Utc::now(),
        };
        messages.push(created.clone());
        Ok(created)
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|message| message.group_id == group_id).cloned().collect())
    }
}

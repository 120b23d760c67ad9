//! Group planning services behind the HTTP API.
//!
//! Every operation resolves the group by code first and reports an unknown
//! code as [`ApplicationError::NotFound`]. Storage failures surface as
//! [`ApplicationError::Persistence`].

use std::sync::Arc;

use planpal_agent::Assistant;
use planpal_core::domain::chat::{ChatMessage, NewChatMessage};
use planpal_core::domain::group::{BudgetLevel, Group, GroupCode, GroupId, Mood, NewGroup};
use planpal_core::domain::member::{Member, MemberId, NewMember};
use planpal_core::domain::poll::{NewPoll, NewVote, Poll, PollId, PollOption, PollTally};
use planpal_core::domain::suggestion::Suggestion;
use planpal_core::errors::ApplicationError;
use planpal_core::geo::{centroid, Coordinates};
use planpal_core::sources::{normalize_batch, CandidateQuery, SourceKind};
use planpal_db::repositories::{Repositories, RepositoryError};
use tracing::{info, warn};

use crate::sources::SourceAdapter;

/// Fresh codes drawn before group creation gives up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct CreatedGroup {
    pub group: Group,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupOverview {
    pub group: Group,
    pub members: Vec<Member>,
    pub suggestions: Vec<Suggestion>,
    pub polls: Vec<Poll>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatOutcome {
    pub message: ChatMessage,
    pub bot_response: Option<String>,
}

#[derive(Clone)]
pub struct PlannerService {
    repos: Repositories,
    sources: Arc<SourceAdapter>,
    assistant: Assistant,
    public_base_url: String,
}

impl PlannerService {
    pub fn new(
        repos: Repositories,
        sources: Arc<SourceAdapter>,
        assistant: Assistant,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self { repos, sources, assistant, public_base_url: public_base_url.into() }
    }

    pub fn sources(&self) -> Arc<SourceAdapter> {
        Arc::clone(&self.sources)
    }

    pub async fn create_group(
        &self,
        name: &str,
        mood: Option<&str>,
        budget_level: Option<&str>,
    ) -> Result<CreatedGroup, ApplicationError> {
        let mut candidate = NewGroup::new(
            name.trim(),
            mood.map(Mood::parse),
            budget_level.map(BudgetLevel::parse),
        )?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            match self.repos.groups.create(candidate.clone()).await {
                Ok(group) => {
                    info!(
                        event_name = "planner.group.created",
                        group_code = %group.code,
                        attempt,
                        "group created"
                    );
                    let link = group.join_link(&self.public_base_url);
                    return Ok(CreatedGroup { group, link });
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!(
                        event_name = "planner.group.code_conflict",
                        group_code = %candidate.code,
                        attempt,
                        "group code already taken, drawing another"
                    );
                    candidate = candidate.recoded();
                }
                Err(error) => return Err(persistence(error)),
            }
        }

        Err(ApplicationError::Persistence(format!(
            "no free group code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    pub async fn join_group(
        &self,
        code: &str,
        name: &str,
        avatar_url: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<Member, ApplicationError> {
        let group = self.group_by_code(code).await?;
        let member = NewMember::new(name.trim(), avatar_url, lat, lng)?;
        let member = self.repos.members.add(group.id, member).await.map_err(persistence)?;

        info!(
            event_name = "planner.member.joined",
            group_code = %group.code,
            member_id = %member.id,
            has_location = member.location.is_some(),
            "member joined group"
        );
        Ok(member)
    }

    pub async fn group_overview(&self, code: &str) -> Result<GroupOverview, ApplicationError> {
        let group = self.group_by_code(code).await?;
        let members = self.repos.members.list_for_group(group.id).await.map_err(persistence)?;
        let suggestions =
            self.repos.suggestions.list_for_group(group.id).await.map_err(persistence)?;
        let polls = self.repos.polls.list_for_group(group.id).await.map_err(persistence)?;

        Ok(GroupOverview { group, members, suggestions, polls })
    }

    /// Fetches candidates around the members' centroid and persists up to four.
    pub async fn generate_suggestions(
        &self,
        code: &str,
        kind: SourceKind,
    ) -> Result<Vec<Suggestion>, ApplicationError> {
        let group = self.group_by_code(code).await?;
        let members = self.repos.members.list_for_group(group.id).await.map_err(persistence)?;

        let query = CandidateQuery {
            kind,
            mood: group.effective_mood(),
            budget: group.effective_budget(),
            location: members_centroid(&members),
        };
        let candidates = self.sources.fetch_candidates(&query).await;
        let batch = normalize_batch(&candidates);

        let persisted =
            self.repos.suggestions.insert_batch(group.id, batch).await.map_err(persistence)?;
        info!(
            event_name = "planner.suggestions.generated",
            group_code = %group.code,
            source = kind.as_str(),
            candidates = candidates.len(),
            persisted = persisted.len(),
            "suggestions generated"
        );
        Ok(persisted)
    }

    pub async fn list_suggestions(&self, code: &str) -> Result<Vec<Suggestion>, ApplicationError> {
        let group = self.group_by_code(code).await?;
        self.repos.suggestions.list_for_group(group.id).await.map_err(persistence)
    }

    pub async fn create_poll(
        &self,
        code: &str,
        title: &str,
        options: Vec<PollOption>,
    ) -> Result<Poll, ApplicationError> {
        let group = self.group_by_code(code).await?;
        let poll = NewPoll::new(title.trim(), options)?;
        let poll = self.repos.polls.create(group.id, poll).await.map_err(persistence)?;

        info!(
            event_name = "planner.poll.created",
            group_code = %group.code,
            poll_id = %poll.id,
            options = poll.options.len(),
            "poll created"
        );
        Ok(poll)
    }

    /// Appends a vote. Option ids and members are not checked against the poll.
    pub async fn cast_vote(
        &self,
        code: &str,
        poll_id: PollId,
        vote: NewVote,
    ) -> Result<Poll, ApplicationError> {
        let group = self.group_by_code(code).await?;
        self.poll_in_group(&group, poll_id).await?;

        let option_id = vote.option_id.clone();
        self.repos.polls.append_vote(poll_id, vote).await.map_err(|error| match error {
            RepositoryError::NotFound(_) => {
                ApplicationError::not_found("poll", poll_id.to_string())
            }
            other => persistence(other),
        })?;

        info!(
            event_name = "planner.poll.vote_cast",
            group_code = %group.code,
            poll_id = %poll_id,
            option_id = %option_id,
            "vote appended"
        );
        self.poll_in_group(&group, poll_id).await
    }

    pub async fn poll_results(
        &self,
        code: &str,
        poll_id: PollId,
    ) -> Result<PollTally, ApplicationError> {
        let group = self.group_by_code(code).await?;
        Ok(self.poll_in_group(&group, poll_id).await?.tally())
    }

    /// Stores the message; a message addressed to the assistant also stores its reply.
    pub async fn post_chat(
        &self,
        code: &str,
        member_id: Option<MemberId>,
        message: &str,
    ) -> Result<ChatOutcome, ApplicationError> {
        let group = self.group_by_code(code).await?;
        let stored = self
            .repos
            .chat
            .append(group.id, NewChatMessage { member_id, message: message.to_string() })
            .await
            .map_err(persistence)?;

        if !self.assistant.is_addressed(message) {
            return Ok(ChatOutcome { message: stored, bot_response: None });
        }

        let reply = self.assistant_reply(&group, message).await?;
        self.repos
            .chat
            .append(group.id, NewChatMessage { member_id: None, message: reply.clone() })
            .await
            .map_err(persistence)?;
        info!(
            event_name = "planner.chat.assistant_replied",
            group_code = %group.code,
            "assistant replied in chat"
        );

        Ok(ChatOutcome { message: stored, bot_response: Some(reply) })
    }

    pub async fn list_chat(&self, code: &str) -> Result<Vec<ChatMessage>, ApplicationError> {
        let group = self.group_by_code(code).await?;
        self.repos.chat.list_for_group(group.id).await.map_err(persistence)
    }

    /// Direct assistant query; no mention required and nothing is stored.
    pub async fn bot_query(
        &self,
        group_id: GroupId,
        text: &str,
    ) -> Result<String, ApplicationError> {
        let group = self
            .repos
            .groups
            .find_by_id(group_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::not_found("group", group_id.to_string()))?;

        self.assistant_reply(&group, text).await
    }

    async fn assistant_reply(&self, group: &Group, text: &str) -> Result<String, ApplicationError> {
        let suggestions =
            self.repos.suggestions.list_for_group(group.id).await.map_err(persistence)?;
        Ok(self.assistant.reply(text, &group.effective_budget(), &suggestions))
    }

    async fn group_by_code(&self, raw: &str) -> Result<Group, ApplicationError> {
        let not_found = || ApplicationError::not_found("group", raw.trim());
        let code = GroupCode::parse(raw.trim()).map_err(|_| not_found())?;

        self.repos.groups.find_by_code(&code).await.map_err(persistence)?.ok_or_else(not_found)
    }

    async fn poll_in_group(
        &self,
        group: &Group,
        poll_id: PollId,
    ) -> Result<Poll, ApplicationError> {
        self.repos
            .polls
            .find(group.id, poll_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::not_found("poll", poll_id.to_string()))
    }
}

/// Mean position of members that shared a location.
pub fn members_centroid(members: &[Member]) -> Coordinates {
    centroid(members.iter().filter_map(|member| member.location))
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use planpal_agent::Assistant;
    use planpal_core::cache::InMemoryCandidateCache;
    use planpal_core::domain::group::GroupId;
    use planpal_core::domain::member::MemberId;
    use planpal_core::domain::poll::{NewVote, PollId, PollOption};
    use planpal_core::domain::suggestion::SuggestionKind;
    use planpal_core::errors::ApplicationError;
    use planpal_core::geo::{Coordinates, DEFAULT_LOCATION};
    use planpal_core::sources::SourceKind;
    use planpal_db::repositories::Repositories;

    use super::{members_centroid, PlannerService};
    use crate::sources::{ProviderSlot, SourceAdapter};

    fn planner() -> PlannerService {
        let sources = SourceAdapter::new(
            ProviderSlot::MissingCredential,
            ProviderSlot::MissingCredential,
            Arc::new(InMemoryCandidateCache::new(1800)),
        );
        PlannerService::new(
            Repositories::in_memory(),
            Arc::new(sources),
            Assistant::default(),
            "https://planpal.example/",
        )
    }

    fn option(id: &str, title: &str) -> PollOption {
        PollOption { id: id.to_string(), title: title.to_string() }
    }

    fn vote(option_id: &str, member: i64) -> NewVote {
        NewVote {
            option_id: option_id.to_string(),
            member_id: MemberId(member),
            emoji: "👍".to_string(),
        }
    }

    #[tokio::test]
    async fn create_group_returns_join_link() {
        let planner = planner();

        let created =
            planner.create_group("  Weekend Crew ", Some("foodie"), None).await.expect("group");

        assert_eq!(created.group.name, "Weekend Crew");
        assert_eq!(created.link, format!("https://planpal.example/g/{}", created.group.code));
        assert_eq!(created.group.budget_level, None);
    }

    #[tokio::test]
    async fn blank_group_name_is_rejected() {
        let error = planner().create_group("   ", None, None).await.expect_err("blank name");

        assert!(matches!(error, ApplicationError::Domain(_)));
    }

    #[tokio::test]
    async fn unknown_or_malformed_codes_are_not_found() {
        let planner = planner();

        for code in ["ZZZZZZ", "abc", ""] {
            let error = planner.group_overview(code).await.expect_err("missing group");
            assert!(matches!(error, ApplicationError::NotFound { entity: "group", .. }));
        }
    }

    #[tokio::test]
    async fn generation_without_keys_persists_four_fallback_suggestions() {
        let planner = planner();
        let code = planner.create_group("Crew", None, None).await.expect("group").group.code;
        let code = code.as_str();

        let places = planner.generate_suggestions(code, SourceKind::Places).await.expect("places");
        let movies = planner.generate_suggestions(code, SourceKind::Movies).await.expect("movies");

        assert_eq!(places.len(), 4);
        assert!(places.iter().all(|s| s.kind() == SuggestionKind::Place));
        assert_eq!(movies[0].title, "Zindagi Na Milegi Dobara");
        assert_eq!(planner.list_suggestions(code).await.expect("list").len(), 8);
    }

    #[tokio::test]
    async fn votes_accumulate_and_tally_reports_undeclared_options() {
        let planner = planner();
        let code = planner.create_group("Crew", None, None).await.expect("group").group.code;
        let code = code.as_str();
        let poll = planner
            .create_poll(
                code,
                "Where?",
                vec![option("opt1", "Cubbon Park"), option("opt2", "Wonderla")],
            )
            .await
            .expect("poll");

        planner.cast_vote(code, poll.id, vote("opt1", 1)).await.expect("vote");
        planner.cast_vote(code, poll.id, vote("opt1", 1)).await.expect("repeat vote");
        let after = planner.cast_vote(code, poll.id, vote("opt9", 2)).await.expect("odd vote");
        let tally = planner.poll_results(code, poll.id).await.expect("tally");

        assert_eq!(after.votes["opt1"].len(), 2);
        assert_eq!(tally.options[0].count, 2);
        assert_eq!(tally.options[1].count, 0);
        assert_eq!(tally.undeclared.get("opt9"), Some(&1));
        assert_eq!(tally.total_votes, 3);
    }

    #[tokio::test]
    async fn polls_are_scoped_to_their_group() {
        let planner = planner();
        let first = planner.create_group("One", None, None).await.expect("group").group.code;
        let second = planner.create_group("Two", None, None).await.expect("group").group.code;
        let poll = planner
            .create_poll(first.as_str(), "Pick", vec![option("a", "A")])
            .await
            .expect("poll");

        let foreign = planner.cast_vote(second.as_str(), poll.id, vote("a", 1)).await;
        let missing = planner.cast_vote(first.as_str(), PollId(99), vote("a", 1)).await;

        assert!(matches!(foreign, Err(ApplicationError::NotFound { entity: "poll", .. })));
        assert!(matches!(missing, Err(ApplicationError::NotFound { entity: "poll", .. })));
    }

    #[tokio::test]
    async fn duplicate_poll_options_are_rejected() {
        let planner = planner();
        let code = planner.create_group("Crew", None, None).await.expect("group").group.code;

        let error = planner
            .create_poll(code.as_str(), "Pick", vec![option("a", "A"), option("a", "B")])
            .await
            .expect_err("duplicate ids");

        assert!(matches!(error, ApplicationError::Domain(_)));
    }

    #[tokio::test]
    async fn chat_only_wakes_assistant_on_exact_mention() {
        let planner = planner();
        let code = planner.create_group("Crew", None, None).await.expect("group").group.code;
        let code = code.as_str();

        let quiet = planner.post_chat(code, Some(MemberId(1)), "hi @planpal").await.expect("chat");
        let loud =
            planner.post_chat(code, Some(MemberId(1)), "@PlanPal safety").await.expect("chat");
        let history = planner.list_chat(code).await.expect("history");

        assert_eq!(quiet.bot_response, None);
        assert_eq!(
            loud.bot_response.as_deref(),
            Some("No suggestions available yet. Add some places or movies first!")
        );
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].member_id, None);
    }

    #[tokio::test]
    async fn bot_query_skips_mention_and_requires_known_group() {
        let planner = planner();
        let created = planner.create_group("Crew", None, None).await.expect("group");
        let code = created.group.code.as_str();
        planner.generate_suggestions(code, SourceKind::Places).await.expect("places");

        let reply = planner.bot_query(created.group.id, "safety please").await.expect("reply");
        let missing = planner.bot_query(GroupId(404), "suggest").await;

        assert!(reply.starts_with("🚨 Safety tips:"));
        assert!(matches!(missing, Err(ApplicationError::NotFound { entity: "group", .. })));
        assert!(planner.list_chat(code).await.expect("history").is_empty());
    }

    #[tokio::test]
    async fn centroid_ignores_members_without_location() {
        let planner = planner();
        let code = planner.create_group("Crew", None, None).await.expect("group").group.code;
        let code = code.as_str();
        planner.join_group(code, "Asha", None, Some(12.0), Some(77.0)).await.expect("join");
        planner.join_group(code, "Ravi", None, Some(14.0), Some(79.0)).await.expect("join");
        planner.join_group(code, "Nomad", None, Some(20.0), None).await.expect("join");

        let overview = planner.group_overview(code).await.expect("overview");

        assert_eq!(overview.members.len(), 3);
        assert_eq!(members_centroid(&overview.members), Coordinates::new(13.0, 78.0));
        assert_eq!(members_centroid(&[]), DEFAULT_LOCATION);
    }
}

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod geo;
pub mod sources;
pub mod suggestions;

pub use cache::{CandidateCache, Clock, InMemoryCandidateCache, ManualClock, SystemClock};
pub use domain::chat::{ChatMessage, ChatMessageId, NewChatMessage};
pub use domain::group::{BudgetLevel, Group, GroupCode, GroupId, Mood, NewGroup};
pub use domain::member::{Member, MemberId, NewMember};
pub use domain::poll::{
    NewPoll, NewVote, OptionTally, Poll, PollId, PollOption, PollTally, VoteEntry,
};
pub use domain::suggestion::{
    NewSuggestion, Suggestion, SuggestionId, SuggestionKind, SuggestionMetadata,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use geo::Coordinates;
pub use sources::{CandidateQuery, RawCandidate, SourceKind};
pub use suggestions::{RankedSuggestion, ScoreCalculator, ScoringContext, ScoringWeights};

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::domain::member::MemberId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub i64);

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub member_id: MemberId,
    pub emoji: String,
}

/// A poll and its append-only vote ledger.
///
/// Votes are keyed by the option id they were cast for. The ledger accepts ids
/// that are not among `options` and repeat votes by the same member; both are
/// surfaced by [`Poll::tally`] rather than rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub group_id: GroupId,
    pub title: String,
    pub options: Vec<PollOption>,
    pub votes: BTreeMap<String, Vec<VoteEntry>>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn record_vote(&mut self, option_id: impl Into<String>, entry: VoteEntry) {
        self.votes.entry(option_id.into()).or_default().push(entry);
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|option| option.id == option_id)
    }

    pub fn tally(&self) -> PollTally {
        let options = self
            .options
            .iter()
            .map(|option| OptionTally {
                id: option.id.clone(),
                title: option.title.clone(),
                count: self.votes.get(&option.id).map(Vec::len).unwrap_or(0),
            })
            .collect::<Vec<_>>();

        let undeclared = self
            .votes
            .iter()
            .filter(|(option_id, _)| !self.has_option(option_id))
            .map(|(option_id, entries)| (option_id.clone(), entries.len()))
            .collect::<BTreeMap<_, _>>();

        let mut emojis = BTreeMap::new();
        for entry in self.votes.values().flatten() {
            *emojis.entry(entry.emoji.clone()).or_insert(0usize) += 1;
        }

        let total_votes = self.votes.values().map(Vec::len).sum();

        PollTally { poll_id: self.id, options, undeclared, emojis, total_votes }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub id: String,
    pub title: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollTally {
    pub poll_id: PollId,
    pub options: Vec<OptionTally>,
    pub undeclared: BTreeMap<String, usize>,
    pub emojis: BTreeMap<String, usize>,
    pub total_votes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPoll {
    pub title: String,
    pub options: Vec<PollOption>,
}

impl NewPoll {
    pub fn new(title: impl Into<String>, options: Vec<PollOption>) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::InvariantViolation("poll title must not be empty".into()));
        }
        if options.is_empty() {
            return Err(DomainError::InvariantViolation(
                "poll needs at least one option".into(),
            ));
        }

        let mut seen = HashSet::new();
        for option in &options {
            if option.id.trim().is_empty() {
                return Err(DomainError::InvariantViolation(
                    "poll option id must not be empty".into(),
                ));
            }
            if !seen.insert(option.id.as_str()) {
                return Err(DomainError::DuplicatePollOption(option.id.clone()));
            }
        }

        Ok(Self { title, options })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVote {
    pub option_id: String,
    pub member_id: MemberId,
    pub emoji: String,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::{NewPoll, Poll, PollId, PollOption, VoteEntry};
    use crate::domain::group::GroupId;
    use crate::domain::member::MemberId;
    use crate::errors::DomainError;

    fn option(id: &str, title: &str) -> PollOption {
        PollOption { id: id.to_string(), title: title.to_string() }
    }

    fn poll() -> Poll {
        Poll {
            id: PollId(1),
            group_id: GroupId(1),
            title: "Where to?".to_string(),
            options: vec![option("opt1", "Cubbon Park"), option("opt2", "Wonderla")],
            votes: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn vote(member: i64, emoji: &str) -> VoteEntry {
        VoteEntry { member_id: MemberId(member), emoji: emoji.to_string() }
    }

    #[test]
    fn duplicate_option_ids_are_rejected() {
        let result =
            NewPoll::new("Pick one", vec![option("a", "First"), option("a", "Second")]);
        assert_eq!(result, Err(DomainError::DuplicatePollOption("a".to_string())));
    }

    #[test]
    fn votes_accumulate_in_order_per_option() {
        let mut poll = poll();
        poll.record_vote("opt1", vote(1, "👍"));
        poll.record_vote("opt1", vote(2, "❤️"));

        assert_eq!(poll.votes["opt1"], vec![vote(1, "👍"), vote(2, "❤️")]);
    }

    #[test]
    fn tally_counts_declared_undeclared_and_emojis() {
        let mut poll = poll();
        poll.record_vote("opt1", vote(1, "👍"));
        poll.record_vote("opt1", vote(1, "👍"));
        poll.record_vote("ghost", vote(3, "🔥"));

        let tally = poll.tally();
        assert_eq!(tally.options[0].count, 2);
        assert_eq!(tally.options[1].count, 0);
        assert_eq!(tally.undeclared.get("ghost"), Some(&1));
        assert_eq!(tally.emojis.get("👍"), Some(&2));
        assert_eq!(tally.total_votes, 3);
    }
}

use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

pub const DEMO_GROUP_CODE: &str = "FRIDAY";

/// Votes each demo poll option should carry after seeding.
const SEED_POLLS: &[SeedPollContract] = &[
    SeedPollContract {
        title: "Where should we go this weekend?",
        option_votes: &[("opt1", 2), ("opt2", 1), ("opt3", 2)],
    },
    SeedPollContract { title: "Movie night pick?", option_votes: &[("mov1", 3), ("mov2", 1)] },
];

const SEED_MEMBERS: &[&str] = &["Rahul", "Priya", "Amit", "Sneha", "Vikram"];

const SEED_SUGGESTION_KINDS: &[(&str, i64)] = &[("place", 4), ("movie", 4), ("experience", 4)];

/// The "Friday Fun" demo group.
///
/// Loading is idempotent: the group is deleted (cascading to members,
/// suggestions, polls, votes and chat) and re-inserted in one transaction.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            group_code: DEMO_GROUP_CODE,
            members: SEED_MEMBERS.len(),
            suggestions: SEED_SUGGESTION_KINDS.iter().map(|(_, count)| *count as usize).sum(),
            polls: SEED_POLLS.len(),
        })
    }

    /// Checks the seeded rows against the dataset contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let group_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM planning_group
                           WHERE code = ?1 AND name = 'Friday Fun'
                             AND mood = 'chill' AND budget_level = 'low')",
        )
        .bind(DEMO_GROUP_CODE)
        .fetch_one(pool)
        .await?;
        checks.push(("demo-group", group_ok == 1));

        let members: Vec<String> = sqlx::query_scalar(
            "SELECT m.name FROM group_member m
             JOIN planning_group g ON g.id = m.group_id
             WHERE g.code = ?1 AND m.location_lat IS NOT NULL AND m.location_lng IS NOT NULL
             ORDER BY m.id",
        )
        .bind(DEMO_GROUP_CODE)
        .fetch_all(pool)
        .await?;
        let members_ok = members.iter().map(String::as_str).eq(SEED_MEMBERS.iter().copied());
        checks.push(("demo-members", members_ok));

        for (kind, expected) in SEED_SUGGESTION_KINDS {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM suggestion s
                 JOIN planning_group g ON g.id = s.group_id
                 WHERE g.code = ?1 AND s.kind = ?2",
            )
            .bind(DEMO_GROUP_CODE)
            .bind(kind)
            .fetch_one(pool)
            .await?;
            checks.push((suggestion_label(kind), count == *expected));
        }

        for poll in SEED_POLLS {
            let mut poll_ok = true;
            for (option_id, expected) in poll.option_votes {
                let votes: i64 = sqlx::query_scalar(
                    "SELECT COUNT(1) FROM poll_vote v
                     JOIN poll p ON p.id = v.poll_id
                     JOIN planning_group g ON g.id = p.group_id
                     WHERE g.code = ?1 AND p.title = ?2 AND v.option_id = ?3",
                )
                .bind(DEMO_GROUP_CODE)
                .bind(poll.title)
                .bind(option_id)
                .fetch_one(pool)
                .await?;
                poll_ok &= votes == *expected;
            }
            checks.push((poll.title, poll_ok));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo group and everything attached to it.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM planning_group WHERE code = ?1")
            .bind(DEMO_GROUP_CODE)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedPollContract {
    title: &'static str,
    option_votes: &'static [(&'static str, i64)],
}

fn suggestion_label(kind: &str) -> &'static str {
    match kind {
        "place" => "demo-place-suggestions",
        "movie" => "demo-movie-suggestions",
        _ => "demo-experience-suggestions",
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub group_code: &'static str,
    pub members: usize,
    pub suggestions: usize,
    pub polls: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

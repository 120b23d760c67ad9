use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const GROUP_CODE_LEN: usize = 6;
const GROUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shareable join code: exactly six characters from `A-Z0-9`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupCode(String);

impl GroupCode {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let valid = raw.len() == GROUP_CODE_LEN
            && raw.bytes().all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit());
        if !valid {
            return Err(DomainError::InvalidGroupCode(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..GROUP_CODE_LEN)
            .map(|_| GROUP_CODE_ALPHABET[rng.gen_range(0..GROUP_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GroupCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GroupCode> for String {
    fn from(value: GroupCode) -> Self {
        value.0
    }
}

/// Coarse preference category. Unrecognised values are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mood {
    Adventurous,
    Chill,
    Romantic,
    Foodie,
    FunGetaway,
    Other(String),
}

impl Mood {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "adventurous" => Self::Adventurous,
            "chill" => Self::Chill,
            "romantic" => Self::Romantic,
            "foodie" => Self::Foodie,
            "fun_getaway" => Self::FunGetaway,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Adventurous => "adventurous",
            Self::Chill => "chill",
            Self::Romantic => "romantic",
            Self::Foodie => "foodie",
            Self::FunGetaway => "fun_getaway",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for Mood {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Mood> for String {
    fn from(value: Mood) -> Self {
        value.as_str().to_string()
    }
}

/// Spend tier. Unrecognised values are kept verbatim and score like `medium`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
    Other(String),
}

impl BudgetLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for BudgetLevel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<BudgetLevel> for String {
    fn from(value: BudgetLevel) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub code: GroupCode,
    pub name: String,
    pub mood: Option<Mood>,
    pub budget_level: Option<BudgetLevel>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn effective_mood(&self) -> Mood {
        self.mood.clone().unwrap_or(Mood::Chill)
    }

    pub fn effective_budget(&self) -> BudgetLevel {
        self.budget_level.clone().unwrap_or(BudgetLevel::Medium)
    }

    pub fn join_link(&self, public_base_url: &str) -> String {
        format!("{}/g/{}", public_base_url.trim_end_matches('/'), self.code)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewGroup {
    pub code: GroupCode,
    pub name: String,
    pub mood: Option<Mood>,
    pub budget_level: Option<BudgetLevel>,
}

impl NewGroup {
    pub fn new(
        name: impl Into<String>,
        mood: Option<Mood>,
        budget_level: Option<BudgetLevel>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvariantViolation("group name must not be empty".into()));
        }
        Ok(Self { code: GroupCode::generate(), name, mood, budget_level })
    }

    /// Same group with a freshly drawn code, used after a uniqueness conflict.
    pub fn recoded(self) -> Self {
        Self { code: GroupCode::generate(), ..self }
    }
}

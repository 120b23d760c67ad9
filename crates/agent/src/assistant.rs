use planpal_core::domain::group::BudgetLevel;
use planpal_core::domain::suggestion::Suggestion;
use planpal_core::suggestions::{ScoreCalculator, ScoringContext};
use tracing::debug;

use crate::replies;

pub const DEFAULT_MENTION: &str = "@PlanPal";

/// Number of picks listed by the suggest intent.
pub const TOP_PICKS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Suggest,
    Safety,
    Compare,
    ProsCons,
    Help,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggest => "suggest",
            Self::Safety => "safety",
            Self::Compare => "compare",
            Self::ProsCons => "proscons",
            Self::Help => "help",
        }
    }
}

type Handler = fn(&Assistant, &BudgetLevel, &[Suggestion]) -> String;

struct Route {
    intent: Intent,
    matches: fn(&str) -> bool,
    handler: Handler,
}

/// First matching route wins; `Help` matches everything.
const ROUTES: &[Route] = &[
    Route {
        intent: Intent::Suggest,
        matches: |text| text.contains("suggest"),
        handler: Assistant::top_picks,
    },
    Route {
        intent: Intent::Safety,
        matches: |text| text.contains("safety"),
        handler: |_, _, _| replies::SAFETY_TIPS.to_string(),
    },
    Route {
        intent: Intent::Compare,
        matches: |text| text.contains("compare"),
        handler: |_, _, suggestions| match suggestions {
            [first, second, ..] => replies::comparison(first, second),
            _ => replies::NEED_TWO_TO_COMPARE.to_string(),
        },
    },
    Route {
        intent: Intent::ProsCons,
        matches: |text| text.contains("pros") || text.contains("proscons"),
        handler: |_, _, suggestions| match suggestions {
            [first, ..] => replies::pros_and_cons(first),
            [] => replies::NO_SUGGESTIONS.to_string(),
        },
    },
    Route { intent: Intent::Help, matches: |_| true, handler: |_, _, _| replies::HELP.to_string() },
];

/// Keyword intent for a message. Matching ignores case.
pub fn classify(text: &str) -> Intent {
    route_for(&text.to_lowercase()).intent
}

fn route_for(lowered: &str) -> &'static Route {
    ROUTES.iter().find(|route| (route.matches)(lowered)).unwrap_or(&ROUTES[ROUTES.len() - 1])
}

#[derive(Clone, Debug)]
pub struct Assistant {
    mention: String,
    scorer: ScoreCalculator,
}

impl Default for Assistant {
    fn default() -> Self {
        Self::new(DEFAULT_MENTION)
    }
}

impl Assistant {
    pub fn new(mention: impl Into<String>) -> Self {
        Self { mention: mention.into(), scorer: ScoreCalculator::new() }
    }

    pub fn mention(&self) -> &str {
        &self.mention
    }

    /// Case-sensitive: `@planpal` does not address `@PlanPal`.
    pub fn is_addressed(&self, text: &str) -> bool {
        text.contains(self.mention.as_str())
    }

    /// Answers `text` using the group's budget and persisted suggestions.
    ///
    /// Does not check the mention; chat callers gate on [`Assistant::is_addressed`].
    pub fn reply(&self, text: &str, budget: &BudgetLevel, suggestions: &[Suggestion]) -> String {
        if suggestions.is_empty() {
            debug!(
                event_name = "assistant.reply.no_suggestions",
                budget = budget.as_str(),
                "assistant has nothing to work with"
            );
            return replies::NO_SUGGESTIONS.to_string();
        }

        let route = route_for(&text.to_lowercase());
        debug!(
            event_name = "assistant.reply.routed",
            intent = route.intent.as_str(),
            suggestions = suggestions.len(),
            "assistant intent routed"
        );
        (route.handler)(self, budget, suggestions)
    }

    fn top_picks(&self, budget: &BudgetLevel, suggestions: &[Suggestion]) -> String {
        let context = ScoringContext::neutral(budget.clone());
        let ranked = self.scorer.rank(suggestions, |_| context.clone(), TOP_PICKS);
        replies::top_picks(&ranked)
    }
}

use std::fmt::Write as _;

use planpal_core::domain::suggestion::Suggestion;
use planpal_core::suggestions::RankedSuggestion;

pub(crate) const NO_SUGGESTIONS: &str =
    "No suggestions available yet. Add some places or movies first!";

pub(crate) const NEED_TWO_TO_COMPARE: &str = "Need at least 2 suggestions to compare!";

pub(crate) const HELP: &str =
    "I can help with: suggest, compare, safety, proscons. Just mention me with @PlanPal!";

pub(crate) const SAFETY_TIPS: &str = "🚨 Safety tips:\n\
• Share live location with group\n\
• Keep emergency contacts handy\n\
• Travel in daylight when possible\n\
• Nearest police station: 2.3 km away";

pub(crate) fn top_picks(ranked: &[RankedSuggestion<'_, Suggestion>]) -> String {
    let mut reply = String::from("🎯 Top picks for you:\n\n");
    for (position, pick) in ranked.iter().enumerate() {
        let _ = write!(
            reply,
            "{}. **{}** (Rating: {}/5)\n   ₹{} for 2 | Score: {:.2}\n\n",
            position + 1,
            pick.item.title,
            rating_label(pick.item.rating),
            price_label(pick.item.price_estimate),
            pick.score
        );
    }
    reply
}

pub(crate) fn comparison(first: &Suggestion, second: &Suggestion) -> String {
    let mut reply = String::from("📊 Comparison:\n\n");
    for suggestion in [first, second] {
        let _ = write!(
            reply,
            "**{}**\nRating: {}/5 | ₹{}\n\n",
            suggestion.title,
            rating_label(suggestion.rating),
            price_label(suggestion.price_estimate)
        );
    }
    // The card ends with a single newline.
    reply.pop();
    reply
}

pub(crate) fn pros_and_cons(suggestion: &Suggestion) -> String {
    format!(
        "**{}**\n\n\
         ✅ Pros:\n• Highly rated\n• Within budget\n• Good accessibility\n\n\
         ⚠️ Cons:\n• May be crowded on weekends\n• Limited parking",
        suggestion.title
    )
}

/// Whole ratings keep one decimal place (`4.0`), others print as stored.
pub(crate) fn rating_label(rating: Option<f64>) -> String {
    match rating {
        Some(value) if value.fract() == 0.0 => format!("{value:.1}"),
        Some(value) => value.to_string(),
        None => "N/A".to_string(),
    }
}

fn price_label(price: Option<i64>) -> String {
    price.map_or_else(|| "N/A".to_string(), |value| value.to_string())
}

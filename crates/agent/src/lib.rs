//! PlanPal assistant - rule-based replies for group chat
//!
//! Messages that mention the assistant (`@PlanPal` by default) are routed
//! through an ordered table of keyword predicates:
//! 1. **suggest** - rank the group's suggestions and list the top three
//! 2. **safety** - canned travel safety tips
//! 3. **compare** - the first two suggestions side by side
//! 4. **pros / proscons** - a fixed pros and cons card for the first suggestion
//! 5. anything else - help text
//!
//! The assistant never touches storage. Callers hand it the group's budget
//! and persisted suggestions and store the reply themselves.

pub mod assistant;
mod replies;

pub use assistant::{Assistant, Intent, DEFAULT_MENTION};

//! PlanPal HTTP server: group planning API, suggestion sources and bootstrap.

pub mod api;
pub mod bootstrap;
pub mod health;
pub mod planner;
pub mod sources;

pub use api::{app, router};
pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use planner::PlannerService;
pub use sources::{FetchFailure, SourceAdapter};

//! JSON API for groups, suggestions, polls and chat.
//!
//! Endpoints:
//! - `GET  /`                                       service banner
//! - `POST /group`                                  create a group
//! - `GET  /group/{code}`                           group overview
//! - `POST /group/{code}/join`                      join a group
//! - `POST /group/{code}/suggestions?source=`       generate suggestions (google|tmdb)
//! - `GET  /group/{code}/suggestions`               list suggestions
//! - `POST /group/{code}/polls`                     create a poll
//! - `POST /group/{code}/polls/{poll_id}/vote`      cast a vote
//! - `GET  /group/{code}/polls/{poll_id}/results`   poll tally
//! - `POST /group/{code}/chat`                      post a chat message
//! - `GET  /group/{code}/chat`                      chat history
//! - `POST /bot/query`                              ask the assistant directly
//!
//! Failures answer `{"error": ..., "correlation_id": ...}`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use planpal_core::domain::chat::ChatMessage;
use planpal_core::domain::group::{Group, GroupId};
use planpal_core::domain::member::{Member, MemberId};
use planpal_core::domain::poll::{NewVote, Poll, PollId, PollOption, PollTally, VoteEntry};
use planpal_core::domain::suggestion::{Suggestion, SuggestionMetadata};
use planpal_core::errors::{ApplicationError, InterfaceError};
use planpal_core::sources::SourceKind;
use planpal_db::DbPool;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::health;
use crate::planner::{GroupOverview, PlannerService};

pub const SERVICE_BANNER: &str = "Plan My Outings API";

#[derive(Clone)]
pub struct ApiState {
    planner: Arc<PlannerService>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub mood: Option<String>,
    pub budget_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinGroupRequest {
    pub name: String,
    pub avatar_url: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionSourceQuery {
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub member_id: i64,
    pub option_id: String,
    pub emoji: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub member_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BotQueryRequest {
    pub group_id: i64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub mood: Option<String>,
    pub budget_level: Option<String>,
    pub created_at: String,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.0,
            code: group.code.to_string(),
            name: group.name.clone(),
            mood: group.mood.as_ref().map(|mood| mood.as_str().to_string()),
            budget_level: group.budget_level.as_ref().map(|budget| budget.as_str().to_string()),
            created_at: group.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedGroupResponse {
    pub code: String,
    pub link: String,
    pub group: GroupView,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub joined_at: String,
}

impl From<&Member> for MemberView {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.0,
            name: member.name.clone(),
            avatar_url: member.avatar_url.clone(),
            location_lat: member.location.map(|location| location.lat),
            location_lng: member.location.map(|location| location.lng),
            joined_at: member.joined_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JoinGroupResponse {
    pub member: MemberView,
}

#[derive(Debug, Serialize)]
pub struct SuggestionView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub description: String,
    pub rating: Option<f64>,
    pub price_estimate: Option<i64>,
    pub metadata: SuggestionMetadata,
}

impl From<&Suggestion> for SuggestionView {
    fn from(suggestion: &Suggestion) -> Self {
        Self {
            id: suggestion.id.0,
            kind: suggestion.kind().as_str(),
            title: suggestion.title.clone(),
            description: suggestion.description.clone(),
            rating: suggestion.rating,
            price_estimate: suggestion.price_estimate,
            metadata: suggestion.metadata.clone(),
        }
    }
}

/// Compact record returned right after generation.
#[derive(Debug, Serialize)]
pub struct GeneratedSuggestionView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub rating: Option<f64>,
    pub price_estimate: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedSuggestionsResponse {
    pub suggestions: Vec<GeneratedSuggestionView>,
}

#[derive(Debug, Serialize)]
pub struct PollOptionsView {
    pub options: Vec<PollOption>,
}

#[derive(Debug, Serialize)]
pub struct PollView {
    pub id: i64,
    pub title: String,
    pub options: PollOptionsView,
    pub votes: BTreeMap<String, Vec<VoteEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<&Poll> for PollView {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id.0,
            title: poll.title.clone(),
            options: PollOptionsView { options: poll.options.clone() },
            votes: poll.votes.clone(),
            created_at: Some(poll.created_at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupOverviewResponse {
    pub group: GroupView,
    pub members: Vec<MemberView>,
    pub suggestions: Vec<SuggestionView>,
    pub polls: Vec<PollView>,
}

impl From<&GroupOverview> for GroupOverviewResponse {
    fn from(overview: &GroupOverview) -> Self {
        Self {
            group: GroupView::from(&overview.group),
            members: overview.members.iter().map(MemberView::from).collect(),
            suggestions: overview.suggestions.iter().map(SuggestionView::from).collect(),
            polls: overview.polls.iter().map(PollView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub ok: bool,
    pub bot_response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageView {
    pub id: i64,
    pub member_id: Option<i64>,
    pub message: String,
    pub created_at: String,
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.0,
            member_id: message.member_id.map(|id| id.0),
            message: message.message.clone(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BotReplyResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        let correlation_id = correlation_id();
        Self(InterfaceError::BadRequest { message: message.into(), correlation_id })
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        Self(error.into_interface(correlation_id()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let correlation_id = self.0.correlation_id().to_string();

        // Persistence and configuration details stay in the log.
        let message = if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
            self.0.user_message().to_string()
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
            self.0.message().to_string()
        };

        (status, Json(ErrorBody { error: message, correlation_id })).into_response()
    }
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(planner: PlannerService) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/group", post(create_group))
        .route("/group/{code}", get(group_overview))
        .route("/group/{code}/join", post(join_group))
        .route("/group/{code}/suggestions", post(generate_suggestions).get(list_suggestions))
        .route("/group/{code}/polls", post(create_poll))
        .route("/group/{code}/polls/{poll_id}/vote", post(cast_vote))
        .route("/group/{code}/polls/{poll_id}/results", get(poll_results))
        .route("/group/{code}/chat", post(post_chat).get(list_chat))
        .route("/bot/query", post(bot_query))
        .with_state(ApiState { planner: Arc::new(planner) })
}

/// API routes plus `/health`, with permissive CORS and request tracing.
pub fn app(planner: PlannerService, db_pool: DbPool) -> Router {
    let sources = planner.sources();
    router(planner)
        .merge(health::router(db_pool, sources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse { message: SERVICE_BANNER, status: "running" })
}

async fn create_group(
    State(state): State<ApiState>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<Json<CreatedGroupResponse>, ApiError> {
    let Json(body) = payload?;
    let created = state
        .planner
        .create_group(&body.name, body.mood.as_deref(), body.budget_level.as_deref())
        .await?;

    Ok(Json(CreatedGroupResponse {
        code: created.group.code.to_string(),
        link: created.link,
        group: GroupView::from(&created.group),
    }))
}

async fn group_overview(
    Path(code): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<GroupOverviewResponse>, ApiError> {
    let overview = state.planner.group_overview(&code).await?;
    Ok(Json(GroupOverviewResponse::from(&overview)))
}

async fn join_group(
    Path(code): Path<String>,
    State(state): State<ApiState>,
    payload: Result<Json<JoinGroupRequest>, JsonRejection>,
) -> Result<Json<JoinGroupResponse>, ApiError> {
    let Json(body) = payload?;
    let member =
        state.planner.join_group(&code, &body.name, body.avatar_url, body.lat, body.lng).await?;

    Ok(Json(JoinGroupResponse { member: MemberView::from(&member) }))
}

async fn generate_suggestions(
    Path(code): Path<String>,
    Query(query): Query<SuggestionSourceQuery>,
    State(state): State<ApiState>,
) -> Result<Json<GeneratedSuggestionsResponse>, ApiError> {
    let source = query.source.as_deref().unwrap_or("google");
    let kind = SourceKind::parse(source).ok_or_else(|| {
        ApiError::bad_request(format!("unknown suggestion source `{source}`, expected google|tmdb"))
    })?;

    let suggestions = state.planner.generate_suggestions(&code, kind).await?;
    Ok(Json(GeneratedSuggestionsResponse {
        suggestions: suggestions
            .iter()
            .map(|suggestion| GeneratedSuggestionView {
                id: suggestion.id.0,
                kind: suggestion.kind().as_str(),
                title: suggestion.title.clone(),
                rating: suggestion.rating,
                price_estimate: suggestion.price_estimate,
            })
            .collect(),
    }))
}

async fn list_suggestions(
    Path(code): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    let suggestions = state.planner.list_suggestions(&code).await?;
    Ok(Json(suggestions.iter().map(SuggestionView::from).collect()))
}

async fn create_poll(
    Path(code): Path<String>,
    State(state): State<ApiState>,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<Json<PollView>, ApiError> {
    let Json(body) = payload?;
    let poll = state.planner.create_poll(&code, &body.title, body.options).await?;
    Ok(Json(PollView::from(&poll)))
}

async fn cast_vote(
    path: Result<Path<(String, i64)>, PathRejection>,
    State(state): State<ApiState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<PollView>, ApiError> {
    let Path((code, poll_id)) = path?;
    let Json(body) = payload?;
    let vote = NewVote {
        option_id: body.option_id,
        member_id: MemberId(body.member_id),
        emoji: body.emoji,
    };

    let poll = state.planner.cast_vote(&code, PollId(poll_id), vote).await?;
    Ok(Json(PollView { created_at: None, ..PollView::from(&poll) }))
}

async fn poll_results(
    path: Result<Path<(String, i64)>, PathRejection>,
    State(state): State<ApiState>,
) -> Result<Json<PollTally>, ApiError> {
    let Path((code, poll_id)) = path?;
    Ok(Json(state.planner.poll_results(&code, PollId(poll_id)).await?))
}

async fn post_chat(
    Path(code): Path<String>,
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = payload?;
    let outcome =
        state.planner.post_chat(&code, body.member_id.map(MemberId), &body.message).await?;

    Ok(Json(ChatResponse { ok: true, bot_response: outcome.bot_response }))
}

async fn list_chat(
    Path(code): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<ChatMessageView>>, ApiError> {
    let messages = state.planner.list_chat(&code).await?;
    Ok(Json(messages.iter().map(ChatMessageView::from).collect()))
}

async fn bot_query(
    State(state): State<ApiState>,
    payload: Result<Json<BotQueryRequest>, JsonRejection>,
) -> Result<Json<BotReplyResponse>, ApiError> {
    let Json(body) = payload?;
    let reply = state.planner.bot_query(GroupId(body.group_id), &body.text).await?;
    Ok(Json(BotReplyResponse { reply }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use planpal_core::errors::{ApplicationError, DomainError};

    use super::ApiError;

    #[test]
    fn application_errors_map_to_status_codes() {
        let cases = [
            (ApplicationError::not_found("group", "ABC123"), StatusCode::NOT_FOUND),
            (
                ApplicationError::from(DomainError::DuplicatePollOption("a".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ApplicationError::Persistence("locked".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ApplicationError::Configuration("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let response = ApiError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}

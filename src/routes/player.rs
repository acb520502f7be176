//! Player-facing endpoints. Identity is a resolved `(role, team)` pair: the
//! join code carried in the `X-Team-Code` header is exchanged for the team
//! document on every request.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::TeamEntity,
    dto::{
        common::{AnnouncementView, NotificationView, SubmissionView},
        player::{
            AccusationRequest, AccusationView, FinaleView, FormulaAttemptRequest,
            FormulaAttemptResponse, JoinRequest, LeaderboardResponse, MysteryView,
            ProgressResponse, SubmitAnswerRequest, TeamProfile,
        },
    },
    error::AppError,
    services::{
        announcement_service, finale_service, mystery_service, notification_service,
        player_service, submission_service, team_service,
    },
    state::SharedState,
};

const TEAM_CODE_HEADER: &str = "x-team-code";

/// Resolve the calling team from the `X-Team-Code` header.
pub async fn team_from_headers(
    state: &SharedState,
    headers: &HeaderMap,
) -> Result<TeamEntity, AppError> {
    let code = headers
        .get(TEAM_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing team code header `X-Team-Code`".into())
        })?;

    Ok(team_service::resolve_by_join_code(state, code.trim()).await?)
}

/// Player endpoints for the hunt itself.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/player/join", post(join))
        .route("/player/progress", get(progress))
        .route(
            "/player/submissions",
            get(list_submissions).post(submit_answer),
        )
        .route("/player/notifications", get(list_notifications))
        .route(
            "/player/notifications/{id}/read",
            post(mark_notification_read),
        )
        .route("/player/announcements", get(list_announcements))
        .route("/player/leaderboard", get(leaderboard))
        .route("/player/mystery", get(mystery))
        .route("/player/mystery/accusation", post(accuse))
        .route("/player/finale", get(finale))
        .route("/player/finale/attempt", post(attempt_formula))
}

#[utoipa::path(
    post,
    path = "/player/join",
    tag = "player",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Joined team", body = TeamProfile),
        (status = 401, description = "Unknown join code")
    )
)]
/// Exchange a join code for the team identity.
pub async fn join(
    State(state): State<SharedState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<TeamProfile>, AppError> {
    payload.validate()?;
    let team = team_service::resolve_by_join_code(&state, payload.join_code.trim()).await?;
    Ok(Json(team.into()))
}

#[utoipa::path(
    get,
    path = "/player/progress",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    responses((status = 200, description = "Current clue and tallies", body = ProgressResponse))
)]
/// The team's current clue and completion tallies.
pub async fn progress(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ProgressResponse>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(player_service::team_progress(&state, &team).await?))
}

#[utoipa::path(
    post,
    path = "/player/submissions",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Submission recorded", body = SubmissionView),
        (status = 409, description = "A submission for this clue is already pending or approved")
    )
)]
/// Submit an answer for a clue.
pub async fn submit_answer(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmissionView>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    payload.validate()?;
    Ok(Json(
        submission_service::submit(&state, &team, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/player/submissions",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    responses((status = 200, description = "The team's submissions", body = [SubmissionView]))
)]
/// The team's own submission history.
pub async fn list_submissions(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SubmissionView>>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(
        submission_service::list_for_team(&state, team.id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/player/notifications",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    responses((status = 200, description = "Unread notifications", body = [NotificationView]))
)]
/// The team's unread notifications.
pub async fn list_notifications(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(
        notification_service::list_unread(&state, &team).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/player/notifications/{id}/read",
    tag = "player",
    params(
        ("X-Team-Code" = String, Header, description = "Join code identifying the team"),
        ("id" = Uuid, Path, description = "Notification to consume")
    ),
    responses((status = 204, description = "Notification consumed"))
)]
/// Mark a notification as read after display.
pub async fn mark_notification_read(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    notification_service::mark_read(&state, &team, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/player/announcements",
    tag = "player",
    responses((status = 200, description = "All announcements, newest first", body = [AnnouncementView]))
)]
/// Broadcast announcements, newest first.
pub async fn list_announcements(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AnnouncementView>>, AppError> {
    Ok(Json(announcement_service::list(&state).await?))
}

#[utoipa::path(
    get,
    path = "/player/leaderboard",
    tag = "player",
    responses((status = 200, description = "Teams by completed clue count", body = LeaderboardResponse))
)]
/// Teams ordered by completed clue count.
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(player_service::leaderboard(&state).await?))
}

#[utoipa::path(
    get,
    path = "/player/mystery",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    responses((status = 200, description = "The mystery as visible to this team", body = MysteryView))
)]
/// The side mystery as visible to the calling team.
pub async fn mystery(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<MysteryView>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(mystery_service::player_view(&state, &team).await?))
}

#[utoipa::path(
    post,
    path = "/player/mystery/accusation",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    request_body = AccusationRequest,
    responses(
        (status = 200, description = "Accusation recorded and graded", body = AccusationView),
        (status = 409, description = "The mystery is not open for this team")
    )
)]
/// Record the team's one-shot accusation.
pub async fn accuse(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<AccusationRequest>,
) -> Result<Json<AccusationView>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(mystery_service::accuse(&state, &team, payload).await?))
}

#[utoipa::path(
    get,
    path = "/player/finale",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    responses((status = 200, description = "The finale as visible to this team", body = FinaleView))
)]
/// The finale as visible to the calling team.
pub async fn finale(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<FinaleView>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(finale_service::player_view(&state, &team).await?))
}

#[utoipa::path(
    post,
    path = "/player/finale/attempt",
    tag = "player",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    request_body = FormulaAttemptRequest,
    responses((status = 200, description = "Attempt graded", body = FormulaAttemptResponse))
)]
/// Grade the team's attempt at the finale formula.
pub async fn attempt_formula(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<FormulaAttemptRequest>,
) -> Result<Json<FormulaAttemptResponse>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    Ok(Json(
        finale_service::attempt_formula(&state, &team, payload).await?,
    ))
}

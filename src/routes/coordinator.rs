//! Coordinator-only management endpoints, gated by the token issued on the
//! coordinator SSE stream.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        common::{ActionResponse, AnnouncementView},
        coordinator::{
            AnnouncementInput, ClueDetail, ClueInput, CreateTeamRequest, FinaleConfigInput,
            FinaleTeamRow, MysteryInput, MysteryStatus, ProgressOverview, RejectRequest,
            SubmissionQueueItem, TeamDetail,
        },
    },
    error::AppError,
    services::{
        announcement_service, clue_service, finale_service, mystery_service, review_service,
        team_service,
    },
    state::SharedState,
};

const COORDINATOR_TOKEN_HEADER: &str = "x-coordinator-token";

/// Coordinator-only management endpoints for running the hunt.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/coordinator/teams", get(list_teams).post(create_team))
        .route("/coordinator/teams/{id}", axum::routing::delete(delete_team))
        .route("/coordinator/teams/{id}/reset", post(reset_team))
        .route("/coordinator/progress", get(progress_overview))
        .route("/coordinator/clues", get(list_clues).post(create_clue))
        .route(
            "/coordinator/clues/{id}",
            put(update_clue).delete(delete_clue),
        )
        .route("/coordinator/submissions", get(submission_queue))
        .route(
            "/coordinator/submissions/{id}/approve",
            post(approve_submission),
        )
        .route(
            "/coordinator/submissions/{id}/reject",
            post(reject_submission),
        )
        .route(
            "/coordinator/submissions/{id}",
            axum::routing::delete(delete_submission),
        )
        .route(
            "/coordinator/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route("/coordinator/announcements/{id}", put(edit_announcement))
        .route(
            "/coordinator/mystery",
            get(mystery_status).put(configure_mystery),
        )
        .route("/coordinator/mystery/reveal", post(reveal_mystery))
        .route("/coordinator/finale", put(save_finale_config))
        .route("/coordinator/finale/teams", get(finale_teams))
        .route(
            "/coordinator/finale/teams/{id}/approve",
            post(approve_finale_team),
        )
        .route(
            "/coordinator/finale/teams/{id}/revoke",
            post(revoke_finale_team),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            require_coordinator_token,
        ))
}

#[utoipa::path(
    get,
    path = "/coordinator/teams",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "All teams with join codes", body = [TeamDetail]))
)]
/// The full roster, join codes included.
pub async fn list_teams(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TeamDetail>>, AppError> {
    Ok(Json(team_service::list(&state).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/teams",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    request_body = CreateTeamRequest,
    responses((status = 200, description = "Team registered", body = TeamDetail))
)]
/// Register a new team and allocate its join code.
pub async fn create_team(
    State(state): State<SharedState>,
    Json(payload): Json<CreateTeamRequest>,
) -> Result<Json<TeamDetail>, AppError> {
    payload.validate()?;
    Ok(Json(team_service::register(&state, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/coordinator/teams/{id}",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Team to delete")
    ),
    responses((status = 204, description = "Team and its records deleted"))
)]
/// Delete a team, cascading to its submissions and notifications.
pub async fn delete_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    team_service::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/coordinator/teams/{id}/reset",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Team to reset")
    ),
    responses((status = 200, description = "Progress cleared", body = TeamDetail))
)]
/// Clear a team's progress and gate grants.
pub async fn reset_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamDetail>, AppError> {
    Ok(Json(team_service::reset_progress(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/coordinator/progress",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "Live progress of every team", body = ProgressOverview))
)]
/// Live progress board.
pub async fn progress_overview(
    State(state): State<SharedState>,
) -> Result<Json<ProgressOverview>, AppError> {
    Ok(Json(team_service::progress_overview(&state).await?))
}

#[utoipa::path(
    get,
    path = "/coordinator/clues",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "The clue sequence with answers", body = [ClueDetail]))
)]
/// The clue sequence, expected answers included.
pub async fn list_clues(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ClueDetail>>, AppError> {
    Ok(Json(clue_service::list_detailed(&state).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/clues",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    request_body = ClueInput,
    responses((status = 200, description = "Clue created", body = ClueDetail))
)]
/// Add a clue to the sequence.
pub async fn create_clue(
    State(state): State<SharedState>,
    Json(payload): Json<ClueInput>,
) -> Result<Json<ClueDetail>, AppError> {
    payload.validate()?;
    Ok(Json(clue_service::create(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/coordinator/clues/{id}",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Clue to edit")
    ),
    request_body = ClueInput,
    responses((status = 200, description = "Clue updated", body = ClueDetail))
)]
/// Edit a clue in place, keeping its id.
pub async fn update_clue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClueInput>,
) -> Result<Json<ClueDetail>, AppError> {
    payload.validate()?;
    Ok(Json(clue_service::update(&state, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/coordinator/clues/{id}",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Clue to delete")
    ),
    responses((status = 204, description = "Clue removed"))
)]
/// Remove a clue from the sequence.
pub async fn delete_clue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    clue_service::remove(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/coordinator/submissions",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "Pending submissions awaiting review", body = [SubmissionQueueItem]))
)]
/// The review queue of pending submissions.
pub async fn submission_queue(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SubmissionQueueItem>>, AppError> {
    Ok(Json(review_service::pending_queue(&state).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/submissions/{id}/approve",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Submission to approve")
    ),
    responses(
        (status = 200, description = "Submission approved and team advanced"),
        (status = 409, description = "Submission is not reviewable (still uploading, or terminal)")
    )
)]
/// Approve a submission, advancing the team's progress.
pub async fn approve_submission(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::dto::common::SubmissionView>, AppError> {
    Ok(Json(review_service::approve(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/submissions/{id}/reject",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Submission to reject")
    ),
    request_body = RejectRequest,
    responses((status = 200, description = "Submission rejected and team notified"))
)]
/// Reject a submission, notifying the team with feedback.
pub async fn reject_submission(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<crate::dto::common::SubmissionView>, AppError> {
    Ok(Json(review_service::reject(&state, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/coordinator/submissions/{id}",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Submission to delete")
    ),
    responses(
        (status = 204, description = "Submission removed"),
        (status = 409, description = "Only rejected or failed submissions can be deleted")
    )
)]
/// Delete a rejected or failed submission.
pub async fn delete_submission(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    review_service::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/coordinator/announcements",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "All announcements, newest first", body = [AnnouncementView]))
)]
/// Announcement history.
pub async fn list_announcements(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AnnouncementView>>, AppError> {
    Ok(Json(announcement_service::list(&state).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/announcements",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    request_body = AnnouncementInput,
    responses((status = 200, description = "Announcement broadcast", body = AnnouncementView))
)]
/// Broadcast a new announcement to all teams.
pub async fn create_announcement(
    State(state): State<SharedState>,
    Json(payload): Json<AnnouncementInput>,
) -> Result<Json<AnnouncementView>, AppError> {
    payload.validate()?;
    Ok(Json(announcement_service::broadcast(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/coordinator/announcements/{id}",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Announcement to edit")
    ),
    request_body = AnnouncementInput,
    responses((status = 200, description = "Announcement edited", body = AnnouncementView))
)]
/// Edit a previously sent announcement.
pub async fn edit_announcement(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnnouncementInput>,
) -> Result<Json<AnnouncementView>, AppError> {
    payload.validate()?;
    Ok(Json(announcement_service::edit(&state, id, payload).await?))
}

#[utoipa::path(
    get,
    path = "/coordinator/mystery",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "Mystery configuration and accusations", body = MysteryStatus))
)]
/// Mystery status board: configuration summary plus every accusation.
pub async fn mystery_status(
    State(state): State<SharedState>,
) -> Result<Json<MysteryStatus>, AppError> {
    Ok(Json(mystery_service::status(&state).await?))
}

#[utoipa::path(
    put,
    path = "/coordinator/mystery",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    request_body = MysteryInput,
    responses((status = 200, description = "Mystery saved", body = MysteryStatus))
)]
/// Save the mystery configuration.
pub async fn configure_mystery(
    State(state): State<SharedState>,
    Json(payload): Json<MysteryInput>,
) -> Result<Json<MysteryStatus>, AppError> {
    payload.validate()?;
    Ok(Json(mystery_service::configure(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/mystery/reveal",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "Culprit revealed to all teams", body = MysteryStatus))
)]
/// Reveal the culprit to every team.
pub async fn reveal_mystery(
    State(state): State<SharedState>,
) -> Result<Json<MysteryStatus>, AppError> {
    Ok(Json(mystery_service::reveal(&state).await?))
}

#[utoipa::path(
    put,
    path = "/coordinator/finale",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    request_body = FinaleConfigInput,
    responses((status = 200, description = "Finale configuration saved", body = ActionResponse))
)]
/// Save the finale map and formula configuration.
pub async fn save_finale_config(
    State(state): State<SharedState>,
    Json(payload): Json<FinaleConfigInput>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    finale_service::save_config(&state, payload).await?;
    Ok(Json(ActionResponse {
        message: "saved".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/coordinator/finale/teams",
    tag = "coordinator",
    params(("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream")),
    responses((status = 200, description = "Teams eligible for the finale", body = [FinaleTeamRow]))
)]
/// Teams that have finished the sequence, with their grant status.
pub async fn finale_teams(
    State(state): State<SharedState>,
) -> Result<Json<Vec<FinaleTeamRow>>, AppError> {
    Ok(Json(finale_service::team_rows(&state).await?))
}

#[utoipa::path(
    post,
    path = "/coordinator/finale/teams/{id}/approve",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Team to approve")
    ),
    responses((status = 204, description = "Finale access granted"))
)]
/// Grant a team access to the finale.
pub async fn approve_finale_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    finale_service::set_approval(&state, id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/coordinator/finale/teams/{id}/revoke",
    tag = "coordinator",
    params(
        ("X-Coordinator-Token" = String, Header, description = "Token issued by the /sse/coordinator stream"),
        ("id" = Uuid, Path, description = "Team to revoke")
    ),
    responses((status = 204, description = "Finale access revoked"))
)]
/// Withdraw a team's finale access.
pub async fn revoke_finale_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    finale_service::set_approval(&state, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_coordinator_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(COORDINATOR_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing coordinator token header `X-Coordinator-Token`".into())
        })?;

    let expected = {
        let guard = state.coordinator_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid coordinator token".into())),
        None => Err(AppError::Unauthorized(
            "coordinator SSE stream not initialised yet".into(),
        )),
    }
}

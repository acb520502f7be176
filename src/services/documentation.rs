use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trailhunt Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::coordinator_stream,
        crate::routes::sse::team_stream,
        crate::routes::player::join,
        crate::routes::player::progress,
        crate::routes::player::submit_answer,
        crate::routes::player::list_submissions,
        crate::routes::player::list_notifications,
        crate::routes::player::mark_notification_read,
        crate::routes::player::list_announcements,
        crate::routes::player::leaderboard,
        crate::routes::player::mystery,
        crate::routes::player::accuse,
        crate::routes::player::finale,
        crate::routes::player::attempt_formula,
        crate::routes::coordinator::list_teams,
        crate::routes::coordinator::create_team,
        crate::routes::coordinator::delete_team,
        crate::routes::coordinator::reset_team,
        crate::routes::coordinator::progress_overview,
        crate::routes::coordinator::list_clues,
        crate::routes::coordinator::create_clue,
        crate::routes::coordinator::update_clue,
        crate::routes::coordinator::delete_clue,
        crate::routes::coordinator::submission_queue,
        crate::routes::coordinator::approve_submission,
        crate::routes::coordinator::reject_submission,
        crate::routes::coordinator::delete_submission,
        crate::routes::coordinator::list_announcements,
        crate::routes::coordinator::create_announcement,
        crate::routes::coordinator::edit_announcement,
        crate::routes::coordinator::mystery_status,
        crate::routes::coordinator::configure_mystery,
        crate::routes::coordinator::reveal_mystery,
        crate::routes::coordinator::save_finale_config,
        crate::routes::coordinator::finale_teams,
        crate::routes::coordinator::approve_finale_team,
        crate::routes::coordinator::revoke_finale_team,
    ),
    components(
        schemas(
            crate::dao::models::AnswerKind,
            crate::dao::models::SubmissionStatus,
            crate::dao::models::AnnouncementPriority,
            crate::dto::health::HealthResponse,
            crate::dto::sse::CoordinatorHandshake,
            crate::dto::common::SubmissionView,
            crate::dto::common::AnnouncementView,
            crate::dto::common::NotificationView,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "player", description = "Team-facing hunt operations"),
        (name = "coordinator", description = "Staff review and management operations"),
    )
)]
pub struct ApiDoc;

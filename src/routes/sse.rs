use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    routes::player::team_from_headers,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime public events to connected frontends.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_public(&state);
    info!("New public SSE connection");
    sse_service::broadcast_public_info(state.public_sse(), "public stream connected");
    sse_service::to_sse_stream(receiver, StreamKind::Public)
}

#[utoipa::path(
    get,
    path = "/sse/coordinator",
    tag = "sse",
    responses((status = 200, description = "Coordinator SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream coordinator-only events, establishing the coordinator token.
pub async fn coordinator_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, token) = sse_service::subscribe_coordinator(&state).await?;
    info!("New coordinator SSE connection");
    sse_service::broadcast_coordinator_handshake(state.coordinator_sse(), &token);
    Ok(sse_service::to_sse_stream(
        receiver,
        StreamKind::Coordinator(state),
    ))
}

#[utoipa::path(
    get,
    path = "/sse/team",
    tag = "sse",
    params(("X-Team-Code" = String, Header, description = "Join code identifying the team")),
    responses((status = 200, description = "Per-team SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream events addressed to the calling team (submission updates, notifications).
pub async fn team_stream(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let team = team_from_headers(&state, &headers).await?;
    let receiver = sse_service::subscribe_team(&state, team.id);
    info!(team_id = %team.id, "New team SSE connection");
    Ok(sse_service::to_sse_stream(
        receiver,
        StreamKind::Team(team.id),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/coordinator", get(coordinator_stream))
        .route("/sse/team", get(team_stream))
}

/// Broadcast announcements shared by players and staff.
pub mod announcement_service;
/// Coordinator-side clue sequence management.
pub mod clue_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Finale content behind the two-step unlock gate.
pub mod finale_service;
/// Health check service.
pub mod health_service;
/// Side mystery configuration, views, and accusations.
pub mod mystery_service;
/// One-shot per-team notifications.
pub mod notification_service;
/// Read-only projections for the player dashboard.
pub mod player_service;
/// Progress and gate evaluation over team state.
pub mod progress;
/// Coordinator review decisions and their cascade into team progress.
pub mod review_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision and degraded-mode handling.
pub mod storage_supervisor;
/// The submission pipeline and photo placeholder protocol.
pub mod submission_service;
/// Team registration, identity resolution, and roster operations.
pub mod team_service;

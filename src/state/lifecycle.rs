//! Submission lifecycle state machine.
//!
//! A submission's visible state is its [`SubmissionStatus`] plus the
//! `uploading` overlay, which is only ever true while the status is
//! `Pending`. Terminal states are `Approved`, `Rejected`, and `UploadFailed`;
//! a submission never returns to `Pending` once it has left it.

use thiserror::Error;

use crate::dao::models::{SubmissionEntity, SubmissionStatus};

/// Combined lifecycle position of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionState {
    /// Persisted status.
    pub status: SubmissionStatus,
    /// True while the photo's binary transfer is outstanding.
    pub uploading: bool,
}

/// Events that can be applied to a submission's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The media transfer succeeded and the document is being patched.
    MediaResolved,
    /// The media transfer exhausted its retries.
    MediaFailed,
    /// A coordinator accepted the submission.
    Approve,
    /// A coordinator declined the submission.
    Reject,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The state the submission was in when the invalid event was received.
    pub from: SubmissionState,
    /// The event that cannot be applied from this state.
    pub event: LifecycleEvent,
}

impl SubmissionState {
    /// Lifecycle position of a pending submission with no upload in flight.
    pub fn pending() -> Self {
        Self {
            status: SubmissionStatus::Pending,
            uploading: false,
        }
    }

    /// Lifecycle position of a freshly written photo placeholder.
    pub fn uploading() -> Self {
        Self {
            status: SubmissionStatus::Pending,
            uploading: true,
        }
    }

    /// Read the lifecycle position off a stored submission.
    pub fn of(submission: &SubmissionEntity) -> Self {
        Self {
            status: submission.status,
            uploading: submission.uploading,
        }
    }

    /// Whether the cleanup `delete` operation is permitted from this state.
    ///
    /// Only failed and rejected submissions may be deleted; deleting a
    /// pending submission is not a supported transition, and approved
    /// submissions are part of the team's progress record.
    pub fn deletable(&self) -> bool {
        matches!(
            self.status,
            SubmissionStatus::Rejected | SubmissionStatus::UploadFailed
        )
    }

    /// Compute the state after applying an event, or reject the transition.
    pub fn apply(&self, event: LifecycleEvent) -> Result<SubmissionState, InvalidTransition> {
        let next = match (self.status, self.uploading, event) {
            (SubmissionStatus::Pending, true, LifecycleEvent::MediaResolved) => {
                SubmissionState::pending()
            }
            (SubmissionStatus::Pending, true, LifecycleEvent::MediaFailed) => SubmissionState {
                status: SubmissionStatus::UploadFailed,
                uploading: false,
            },
            (SubmissionStatus::Pending, false, LifecycleEvent::Approve) => SubmissionState {
                status: SubmissionStatus::Approved,
                uploading: false,
            },
            (SubmissionStatus::Pending, false, LifecycleEvent::Reject) => SubmissionState {
                status: SubmissionStatus::Rejected,
                uploading: false,
            },
            _ => {
                return Err(InvalidTransition {
                    from: *self,
                    event,
                });
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_resolves_to_reviewable_pending() {
        let state = SubmissionState::uploading();
        let next = state.apply(LifecycleEvent::MediaResolved).unwrap();
        assert_eq!(next, SubmissionState::pending());
    }

    #[test]
    fn placeholder_failure_ends_in_upload_failed() {
        let state = SubmissionState::uploading();
        let next = state.apply(LifecycleEvent::MediaFailed).unwrap();
        assert_eq!(next.status, SubmissionStatus::UploadFailed);
        assert!(!next.uploading);
        assert!(next.deletable());
    }

    #[test]
    fn pending_can_be_approved_or_rejected() {
        let pending = SubmissionState::pending();
        assert_eq!(
            pending.apply(LifecycleEvent::Approve).unwrap().status,
            SubmissionStatus::Approved
        );
        assert_eq!(
            pending.apply(LifecycleEvent::Reject).unwrap().status,
            SubmissionStatus::Rejected
        );
    }

    #[test]
    fn in_flight_upload_cannot_be_reviewed() {
        let state = SubmissionState::uploading();
        let err = state.apply(LifecycleEvent::Approve).unwrap_err();
        assert_eq!(err.from, state);
        assert_eq!(err.event, LifecycleEvent::Approve);
        assert!(state.apply(LifecycleEvent::Reject).is_err());
    }

    #[test]
    fn terminal_states_accept_no_events() {
        for status in [
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
            SubmissionStatus::UploadFailed,
        ] {
            let state = SubmissionState {
                status,
                uploading: false,
            };
            for event in [
                LifecycleEvent::MediaResolved,
                LifecycleEvent::MediaFailed,
                LifecycleEvent::Approve,
                LifecycleEvent::Reject,
            ] {
                assert!(state.apply(event).is_err(), "{status:?} accepted {event:?}");
            }
        }
    }

    #[test]
    fn only_failed_and_rejected_are_deletable() {
        assert!(!SubmissionState::pending().deletable());
        assert!(!SubmissionState::uploading().deletable());
        assert!(
            !SubmissionState {
                status: SubmissionStatus::Approved,
                uploading: false
            }
            .deletable()
        );
        assert!(
            SubmissionState {
                status: SubmissionStatus::Rejected,
                uploading: false
            }
            .deletable()
        );
    }
}

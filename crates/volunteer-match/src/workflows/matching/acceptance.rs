//! Lifecycle of a single (volunteer, job) pairing.
//!
//! `pending → confirmed → in_progress → completed`, with `dropped` reachable from
//! `confirmed`/`in_progress` and retraction (record removal) from `pending`/`confirmed`.
//! `completed`, `dropped`, and retraction are terminal.

use serde::{Deserialize, Serialize};

use super::domain::AcceptanceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceAction {
    Confirm,
    Start,
    Complete,
    Drop,
    Retract,
}

impl AcceptanceAction {
    pub const fn label(self) -> &'static str {
        match self {
            AcceptanceAction::Confirm => "confirm",
            AcceptanceAction::Start => "start",
            AcceptanceAction::Complete => "complete",
            AcceptanceAction::Drop => "drop",
            AcceptanceAction::Retract => "retract",
        }
    }
}

/// Result of applying an action: the next status, or removal of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved(AcceptanceStatus),
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} a pairing that is {from}", action.label())]
pub struct TransitionError {
    pub from: AcceptanceStatus,
    pub action: AcceptanceAction,
}

impl AcceptanceStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, AcceptanceStatus::Completed | AcceptanceStatus::Dropped)
    }

    /// `Accepted` is the legacy spelling of `Pending` and behaves identically.
    pub fn apply(self, action: AcceptanceAction) -> Result<Transition, TransitionError> {
        use AcceptanceAction as A;
        use AcceptanceStatus as S;

        let next = match (self, action) {
            (S::Pending | S::Accepted, A::Confirm) => Transition::Moved(S::Confirmed),
            (S::Confirmed, A::Start) => Transition::Moved(S::InProgress),
            (S::Confirmed | S::InProgress, A::Complete) => Transition::Moved(S::Completed),
            (S::Confirmed | S::InProgress, A::Drop) => Transition::Moved(S::Dropped),
            (S::Pending | S::Accepted | S::Confirmed, A::Retract) => Transition::Removed,
            (from, action) => return Err(TransitionError { from, action }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [AcceptanceStatus; 6] = [
        AcceptanceStatus::Pending,
        AcceptanceStatus::Accepted,
        AcceptanceStatus::Confirmed,
        AcceptanceStatus::InProgress,
        AcceptanceStatus::Completed,
        AcceptanceStatus::Dropped,
    ];

    const ALL_ACTIONS: [AcceptanceAction; 5] = [
        AcceptanceAction::Confirm,
        AcceptanceAction::Start,
        AcceptanceAction::Complete,
        AcceptanceAction::Drop,
        AcceptanceAction::Retract,
    ];

    #[test]
    fn happy_path_reaches_completed() {
        let confirmed = AcceptanceStatus::Pending.apply(AcceptanceAction::Confirm);
        assert_eq!(confirmed, Ok(Transition::Moved(AcceptanceStatus::Confirmed)));
        let started = AcceptanceStatus::Confirmed.apply(AcceptanceAction::Start);
        assert_eq!(started, Ok(Transition::Moved(AcceptanceStatus::InProgress)));
        let completed = AcceptanceStatus::InProgress.apply(AcceptanceAction::Complete);
        assert_eq!(completed, Ok(Transition::Moved(AcceptanceStatus::Completed)));
    }

    #[test]
    fn legacy_accepted_confirms_like_pending() {
        assert_eq!(
            AcceptanceStatus::Accepted.apply(AcceptanceAction::Confirm),
            Ok(Transition::Moved(AcceptanceStatus::Confirmed))
        );
    }

    #[test]
    fn retraction_only_before_work_starts() {
        for status in ALL_STATUSES {
            let outcome = status.apply(AcceptanceAction::Retract);
            let allowed = matches!(
                status,
                AcceptanceStatus::Pending | AcceptanceStatus::Accepted | AcceptanceStatus::Confirmed
            );
            assert_eq!(outcome.is_ok(), allowed, "retract from {status}");
            if allowed {
                assert_eq!(outcome, Ok(Transition::Removed));
            }
        }
    }

    #[test]
    fn terminal_states_reject_every_action() {
        for status in [AcceptanceStatus::Completed, AcceptanceStatus::Dropped] {
            assert!(status.is_terminal());
            for action in ALL_ACTIONS {
                assert_eq!(
                    status.apply(action),
                    Err(TransitionError {
                        from: status,
                        action
                    })
                );
            }
        }
    }

    #[test]
    fn pending_cannot_complete_or_drop() {
        for action in [AcceptanceAction::Complete, AcceptanceAction::Drop, AcceptanceAction::Start] {
            assert!(AcceptanceStatus::Pending.apply(action).is_err());
        }
    }

    #[test]
    fn confirming_twice_fails() {
        let err = AcceptanceStatus::Confirmed
            .apply(AcceptanceAction::Confirm)
            .expect_err("already confirmed");
        assert_eq!(err.to_string(), "cannot confirm a pairing that is confirmed");
    }
}

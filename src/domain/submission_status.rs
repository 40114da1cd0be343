use serde::Deserialize;
use serde::Serialize;

/// The submission state machine. Transitions form a DAG:
///
/// ```text
/// Submitted -> Forwarded -> {Processed, Failed} -> Completed
/// {Processed, Failed} -> CallbackFailed
/// ```
///
/// No transition ever returns to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    Submitted,
    Forwarded,
    Processed,
    Failed,
    Completed,
    CallbackFailed,
}

impl SubmissionStatus {
    /// Whether `self -> next` is a legal edge in the state DAG.
    pub fn can_transition_to(
        self,
        next: SubmissionStatus,
    ) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Submitted, Forwarded)
                | (Forwarded, Processed)
                | (Forwarded, Failed)
                | (Processed, Completed)
                | (Failed, Completed)
                | (Processed, CallbackFailed)
                | (Failed, CallbackFailed)
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "Submitted",
            Self::Forwarded => "Forwarded",
            Self::Processed => "Processed",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
            Self::CallbackFailed => "CallbackFailed",
        };
        f.write_str(s)
    }
}

/// Job status definitions for tracking crawl job lifecycles
///
/// This module defines the states a crawl job moves through and which
/// transitions between them are legal.
use std::fmt;

/// Represents the current status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Job is queued and waiting to be picked up
    Pending,

    /// Job has been popped and is being fetched/extracted
    Processing,

    /// Job finished with a successful crawl result
    Completed,

    /// Job finished with a failed crawl result
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal status (no further processing)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the job may still be cancelled
    ///
    /// Only pending jobs can be cancelled; a processing job must finish.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Checks whether moving from this status to `next` is allowed
    ///
    /// The only legal paths are `pending -> processing` and
    /// `processing -> completed | failed`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Returns the lowercase name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

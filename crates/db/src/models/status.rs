//! Job status ids, mirroring the seeded `job_statuses` lookup table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Job lifecycle status.
///
/// Discriminants are the 1-based ids seeded into `job_statuses`. There is
/// no `Retrying` status: a job awaiting a retry is `Pending` with a
/// future `next_run_at`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl JobStatus {
    /// The database status id.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// True for statuses with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Map a raw status id back to the enum, if it is a known status.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Running),
            3 => Some(Self::Completed),
            4 => Some(Self::Failed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Pending.id(), 1);
        assert_eq!(JobStatus::Running.id(), 2);
        assert_eq!(JobStatus::Completed.id(), 3);
        assert_eq!(JobStatus::Failed.id(), 4);
        assert_eq!(JobStatus::Cancelled.id(), 5);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = JobStatus::Pending.into();
        assert_eq!(id, 1);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn from_id_round_trips() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(JobStatus::from_id(0), None);
        assert_eq!(JobStatus::from_id(6), None);
    }
}

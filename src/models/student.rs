use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentStatus {
    PendingEnrollment,
    Active,
    OnHold,
    CompletedLevel,
    PendingReEnrollment,
    Completed,
    Withdrawn,
}

text_enum!(StudentStatus, "student status" {
    PendingEnrollment => "Pending Enrollment",
    Active => "Active",
    OnHold => "On Hold",
    CompletedLevel => "Completed Level",
    PendingReEnrollment => "Pending Re-Enrollment",
    Completed => "Completed",
    Withdrawn => "Withdrawn",
});

impl Default for StudentStatus {
    fn default() -> Self {
        StudentStatus::PendingEnrollment
    }
}

/// Result of applying a requested status to a student's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub old_status: StudentStatus,
    pub new_status: StudentStatus,
    pub old_level: i32,
    pub new_level: i32,
}

impl StatusChange {
    /// Only a change of status is written to the history log.
    pub fn is_transition(&self) -> bool {
        self.old_status != self.new_status
    }

    pub fn level_changed(&self) -> bool {
        self.old_level != self.new_level
    }
}

/// Completing a level bumps the level (never past 4) and parks the student
/// in Pending Re-Enrollment; every other status is stored as requested.
pub fn plan_status_change(
    current: StudentStatus,
    level: i32,
    requested: StudentStatus,
) -> StatusChange {
    let (new_status, new_level) = match requested {
        StudentStatus::CompletedLevel => (
            StudentStatus::PendingReEnrollment,
            (level + 1).clamp(MIN_LEVEL, MAX_LEVEL),
        ),
        other => (other, level),
    };
    StatusChange {
        old_status: current,
        new_status,
        old_level: level,
        new_level,
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employer_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub occupation: Option<String>,
    pub level: i32,
    pub status: StudentStatus,
    pub rapids_program_number: Option<String>,
    pub rapids_apprentice_id: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    pub exit_type: Option<String>,
    pub credential: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Student row joined with its login email and sponsoring employer name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StudentListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: Student,
    pub email: String,
    pub employer_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_transition_keeps_level() {
        let change = plan_status_change(StudentStatus::PendingEnrollment, 1, StudentStatus::Active);
        assert_eq!(change.new_status, StudentStatus::Active);
        assert_eq!(change.new_level, 1);
        assert!(change.is_transition());
        assert!(!change.level_changed());
    }

    #[test]
    fn same_status_is_not_a_transition() {
        let change = plan_status_change(StudentStatus::Active, 2, StudentStatus::Active);
        assert!(!change.is_transition());
        assert!(!change.level_changed());
    }

    #[test]
    fn completed_level_advances_and_requires_re_enrollment() {
        let change = plan_status_change(StudentStatus::Active, 2, StudentStatus::CompletedLevel);
        assert_eq!(change.new_status, StudentStatus::PendingReEnrollment);
        assert_eq!(change.new_level, 3);
        assert!(change.is_transition());
    }

    #[test]
    fn level_is_capped_at_four() {
        let change = plan_status_change(StudentStatus::Active, MAX_LEVEL, StudentStatus::CompletedLevel);
        assert_eq!(change.new_level, MAX_LEVEL);
        assert_eq!(change.new_status, StudentStatus::PendingReEnrollment);
        assert!(!change.level_changed());
    }

    #[test]
    fn status_labels_match_the_enumerated_set() {
        let labels: Vec<&str> = StudentStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            labels,
            [
                "Pending Enrollment",
                "Active",
                "On Hold",
                "Completed Level",
                "Pending Re-Enrollment",
                "Completed",
                "Withdrawn",
            ]
        );
        assert!("Graduated".parse::<StudentStatus>().is_err());
        assert!("active".parse::<StudentStatus>().is_err());
    }
}

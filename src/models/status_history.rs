use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::student::StudentStatus;

/// One row per status transition. Rows are only ever inserted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusHistory {
    pub id: i64,
    pub student_id: Uuid,
    pub old_status: StudentStatus,
    pub new_status: StudentStatus,
    pub changed_by_user_id: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

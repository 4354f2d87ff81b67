use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Register,
    ResetPassword,
}

text_enum!(RequestType, "request type" {
    Register => "register",
    ResetPassword => "reset_password",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Completed,
    Dismissed,
}

text_enum!(RequestStatus, "request status" {
    Pending => "pending",
    Completed => "completed",
    Dismissed => "dismissed",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccessRequest {
    pub id: Uuid,
    pub request_type: RequestType,
    pub email: String,
    pub requested_role: Option<Role>,
    pub note: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Employer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmployerListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub employer: Employer,
    pub email: String,
    pub student_count: i64,
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Student,
    Employer,
}

text_enum!(Role, "role" {
    Admin => "admin",
    Student => "student",
    Employer => "employer",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The authenticated caller, passed explicitly into every operation that
/// needs to make an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// Admins pass unconditionally; everyone else must own the record.
    pub fn require_owner_or_admin(&self, owner_user_id: Uuid) -> Result<()> {
        if self.is_admin() || self.user_id == owner_user_id {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels_round_trip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_as_its_label() {
        assert_eq!(serde_json::to_string(&Role::Employer).unwrap(), "\"employer\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn admin_passes_every_ownership_check() {
        let admin = Identity::new(Uuid::new_v4(), Role::Admin);
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_owner_or_admin(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn non_admin_only_reaches_own_records() {
        let student = Identity::new(Uuid::new_v4(), Role::Student);
        assert!(matches!(student.require_admin(), Err(Error::Forbidden)));
        assert!(student.require_owner_or_admin(student.user_id).is_ok());
        assert!(matches!(
            student.require_owner_or_admin(Uuid::new_v4()),
            Err(Error::Forbidden)
        ));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }
}

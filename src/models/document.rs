use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentCategory {
    Id,
    Resume,
    Transcript,
    Certification,
    ApprenticeshipAgreement,
    EmployerAgreement,
    Other,
}

text_enum!(DocumentCategory, "document category" {
    Id => "ID",
    Resume => "Resume",
    Transcript => "Transcript",
    Certification => "Certification",
    ApprenticeshipAgreement => "Apprenticeship Agreement",
    EmployerAgreement => "Employer Agreement",
    Other => "Other",
});

impl DocumentCategory {
    /// Directory name used for this category in the upload tree.
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentCategory::Id => "id",
            DocumentCategory::Resume => "resume",
            DocumentCategory::Transcript => "transcript",
            DocumentCategory::Certification => "certification",
            DocumentCategory::ApprenticeshipAgreement => "apprenticeship-agreement",
            DocumentCategory::EmployerAgreement => "employer-agreement",
            DocumentCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Employer,
}

text_enum!(EntityKind, "entity type" {
    Student => "students",
    Employer => "employers",
});

/// A student or employer profile that owns documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn student(id: Uuid) -> Self {
        Self { kind: EntityKind::Student, id }
    }

    pub fn employer(id: Uuid) -> Self {
        Self { kind: EntityKind::Employer, id }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub student_id: Option<Uuid>,
    pub employer_id: Option<Uuid>,
    pub category: DocumentCategory,
    pub title: String,
    pub original_filename: String,
    #[serde(skip_serializing)]
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn entity(&self) -> Option<EntityRef> {
        match (self.student_id, self.employer_id) {
            (Some(id), None) => Some(EntityRef::student(id)),
            (None, Some(id)) => Some(EntityRef::employer(id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_slugs_are_unique_and_path_safe() {
        let mut slugs: Vec<&str> = DocumentCategory::ALL.iter().map(|c| c.slug()).collect();
        assert!(slugs
            .iter()
            .all(|s| s.chars().all(|c| c.is_ascii_lowercase() || c == '-')));
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), DocumentCategory::ALL.len());
    }

    #[test]
    fn category_parses_from_form_label() {
        assert_eq!("ID".parse::<DocumentCategory>().unwrap(), DocumentCategory::Id);
        assert_eq!(
            " Apprenticeship Agreement ".parse::<DocumentCategory>().unwrap(),
            DocumentCategory::ApprenticeshipAgreement
        );
        assert!("Selfie".parse::<DocumentCategory>().is_err());
    }

    #[test]
    fn document_resolves_its_single_owner() {
        let owner = Uuid::new_v4();
        let doc = Document {
            id: Uuid::new_v4(),
            student_id: None,
            employer_id: Some(owner),
            category: DocumentCategory::EmployerAgreement,
            title: "Agreement".into(),
            original_filename: "agreement.pdf".into(),
            stored_path: "employers/x/employer-agreement/a.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 10,
            uploaded_by_user_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(doc.entity(), Some(EntityRef::employer(owner)));
    }
}

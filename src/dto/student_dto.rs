use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{blank_as_none, trimmed};
use crate::error::{Error, Result};
use crate::utils::time::parse_form_date;

/// Identity and contact fields a student may edit on their own profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub occupation: Option<String>,
}

/// Sponsor link and RAPIDS reporting fields, editable by admins only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentCompliance {
    pub employer_id: Option<Uuid>,
    pub rapids_program_number: Option<String>,
    pub rapids_apprentice_id: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    pub exit_type: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStudentForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub employer_id: Option<String>,
}

impl CreateStudentForm {
    pub fn employer_id(&self) -> Result<Option<Uuid>> {
        parse_optional_id(self.employer_id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StudentProfileForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address_line: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2, message = "Use the two-letter state code"))]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10))]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub occupation: Option<String>,
}

impl StudentProfileForm {
    pub fn into_profile(self) -> Result<StudentProfile> {
        self.validate()?;
        Ok(StudentProfile {
            date_of_birth: parse_date("Date of birth", self.date_of_birth.as_deref())?,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone,
            address_line: self.address_line,
            city: self.city,
            state: self.state.map(|s| s.to_uppercase()),
            postal_code: self.postal_code,
            occupation: self.occupation,
        })
    }
}

/// Admin edit form: the profile fields plus the compliance block.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminStudentForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address_line: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2, message = "Use the two-letter state code"))]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10))]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub occupation: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub employer_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub rapids_program_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub rapids_apprentice_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub enrollment_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub exit_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub exit_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub credential: Option<String>,
}

impl AdminStudentForm {
    pub fn into_parts(self) -> Result<(StudentProfile, StudentCompliance)> {
        self.validate()?;
        let enrollment_date = parse_date("Enrollment date", self.enrollment_date.as_deref())?;
        let exit_date = parse_date("Exit date", self.exit_date.as_deref())?;
        if let (Some(start), Some(end)) = (enrollment_date, exit_date) {
            if end < start {
                return Err(Error::Validation(
                    "Exit date cannot be before the enrollment date".to_string(),
                ));
            }
        }

        let profile = StudentProfile {
            date_of_birth: parse_date("Date of birth", self.date_of_birth.as_deref())?,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone,
            address_line: self.address_line,
            city: self.city,
            state: self.state.map(|s| s.to_uppercase()),
            postal_code: self.postal_code,
            occupation: self.occupation,
        };
        let compliance = StudentCompliance {
            employer_id: parse_optional_id(self.employer_id.as_deref())?,
            rapids_program_number: self.rapids_program_number,
            rapids_apprentice_id: self.rapids_apprentice_id,
            enrollment_date,
            exit_date,
            exit_type: self.exit_type,
            credential: self.credential,
        };
        Ok((profile, compliance))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

fn parse_date(label: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    parse_form_date(raw)
        .map_err(|_| Error::Validation(format!("{} must be a date in YYYY-MM-DD format", label)))
}

fn parse_optional_id(raw: Option<&str>) -> Result<Option<Uuid>> {
    raw.map(|value| {
        Uuid::parse_str(value.trim())
            .map_err(|_| Error::Validation("Select a valid employer".to_string()))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_form(body: &str) -> AdminStudentForm {
        serde_urlencoded::from_str(body).unwrap()
    }

    #[test]
    fn blank_inputs_become_none() {
        let form = admin_form("first_name=Ada&last_name=Lovelace&phone=&employer_id=&exit_date=");
        let (profile, compliance) = form.into_parts().unwrap();
        assert_eq!(profile.phone, None);
        assert_eq!(compliance.employer_id, None);
        assert_eq!(compliance.exit_date, None);
    }

    #[test]
    fn exit_before_enrollment_is_rejected() {
        let form = admin_form(
            "first_name=Ada&last_name=Lovelace&enrollment_date=2024-05-01&exit_date=2024-04-01",
        );
        assert!(matches!(form.into_parts(), Err(Error::Validation(_))));
    }

    #[test]
    fn malformed_date_names_the_field() {
        let form = admin_form("first_name=Ada&last_name=Lovelace&date_of_birth=1/2/1990");
        let err = form.into_parts().unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.starts_with("Date of birth")));
    }

    #[test]
    fn empty_name_fails_validation() {
        let form: StudentProfileForm = serde_urlencoded::from_str("first_name=&last_name=X").unwrap();
        assert!(matches!(form.into_profile(), Err(Error::Invalid(_))));
    }

    #[test]
    fn whitespace_only_name_fails_validation() {
        let form: StudentProfileForm =
            serde_urlencoded::from_str("first_name=+++&last_name=Lovelace").unwrap();
        assert!(matches!(form.into_profile(), Err(Error::Invalid(_))));

        let form = admin_form("first_name=Ada&last_name=%20%09");
        assert!(matches!(form.into_parts(), Err(Error::Invalid(_))));
    }

    #[test]
    fn create_form_names_are_trimmed() {
        let form: CreateStudentForm = serde_urlencoded::from_str(
            "email=a%40portal.test&password=long-enough&first_name=+Ada+&last_name=Lovelace",
        )
        .unwrap();
        assert_eq!(form.first_name, "Ada");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn state_is_uppercased() {
        let form: StudentProfileForm =
            serde_urlencoded::from_str("first_name=A&last_name=B&state=oh").unwrap();
        assert_eq!(form.into_profile().unwrap().state.as_deref(), Some("OH"));
    }
}

use serde::Deserialize;
use validator::Validate;

use crate::dto::{blank_as_none, trimmed};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployerProfile {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmployerForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub contact_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmployerProfileForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 40))]
    pub contact_phone: Option<String>,
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
}

impl EmployerProfileForm {
    pub fn into_profile(self) -> Result<EmployerProfile> {
        self.validate()?;
        Ok(EmployerProfile {
            company_name: self.company_name.trim().to_string(),
            contact_name: self.contact_name,
            contact_phone: self.contact_phone,
            address_line: self.address_line,
            city: self.city,
            state: self.state.map(|s| s.to_uppercase()),
            postal_code: self.postal_code,
        })
    }
}

use serde::Deserialize;
use validator::Validate;

use crate::dto::blank_as_none;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequestForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    pub requested_role: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetRequestForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequestForm {
    pub status: String,
}

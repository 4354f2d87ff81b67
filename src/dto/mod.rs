use serde::{Deserialize, Deserializer};

pub mod access_request_dto;
pub mod auth_dto;
pub mod dashboard_dto;
pub mod employer_dto;
pub mod student_dto;

/// HTML forms submit empty inputs as `""`; treat those as absent.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Required text inputs are validated after trimming, so `"   "` counts as empty.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

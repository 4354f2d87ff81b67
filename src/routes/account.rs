use axum::{
    body::Bytes,
    extract::{Extension, State},
    response::Redirect,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dto::{
    auth_dto::ChangePasswordForm, employer_dto::EmployerProfileForm,
    student_dto::StudentProfileForm,
};
use crate::error::{flash_redirect, Error, Result};
use crate::models::user::{Identity, Role};
use crate::routes::{form_input, FormInput};
use crate::AppState;

pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    form: FormInput<ChangePasswordForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form).and_then(|form| -> Result<_> {
        form.validate()?;
        Ok(form)
    }) {
        Ok(form) => state
            .user_service
            .change_own_password(&identity, &form.current_password, &form.new_password)
            .await
            .map(|_| "Password changed".to_string()),
        Err(e) => Err(e),
    };
    flash_redirect("/dashboard", outcome)
}

/// Students and employers post different profile forms to the same route,
/// so the body is decoded once the caller's role is known.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Redirect> {
    let outcome = apply_profile(&state, &identity, &body)
        .await
        .map(|_| "Profile updated".to_string());
    flash_redirect("/dashboard", outcome)
}

async fn apply_profile(state: &AppState, identity: &Identity, body: &[u8]) -> Result<()> {
    match identity.role {
        Role::Student => {
            let profile = decode::<StudentProfileForm>(body)?.into_profile()?;
            state.student_service.update_own_profile(identity, profile).await?;
        }
        Role::Employer => {
            let profile = decode::<EmployerProfileForm>(body)?.into_profile()?;
            let employer = state
                .employer_service
                .find_by_user(identity.user_id)
                .await?
                .ok_or_else(|| Error::NotFound("Employer profile not found".to_string()))?;
            state.employer_service.update(identity, employer.id, profile).await?;
        }
        Role::Admin => {
            return Err(Error::Validation(
                "Administrator accounts have no profile to edit".to_string(),
            ))
        }
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::Validation(format!("Invalid form submission: {}", e)))
}

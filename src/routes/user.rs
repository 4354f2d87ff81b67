use axum::{
    extract::{Extension, Path, State},
    response::Redirect,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::auth_dto::SetPasswordForm;
use crate::error::{flash_redirect, Result};
use crate::models::user::Identity;
use crate::routes::{form_input, FormInput};
use crate::AppState;

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Redirect> {
    let outcome = state
        .user_service
        .delete(&identity, id)
        .await
        .map(|_| "User deleted".to_string());
    flash_redirect("/admin/students", outcome)
}

pub async fn set_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    form: FormInput<SetPasswordForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form).and_then(|form| -> Result<_> {
        form.validate()?;
        Ok(form)
    }) {
        Ok(form) => state
            .user_service
            .set_password(&identity, id, &form.new_password)
            .await
            .map(|_| "Password reset".to_string()),
        Err(e) => Err(e),
    };
    flash_redirect("/admin/access-requests", outcome)
}

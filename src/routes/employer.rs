use axum::{
    extract::{Extension, Path, Query, State},
    response::Redirect,
    Json,
};
use uuid::Uuid;

use crate::dto::employer_dto::{CreateEmployerForm, EmployerProfileForm};
use crate::error::{flash_redirect, Result};
use crate::models::{employer::EmployerListing, user::Identity};
use crate::routes::{form_input, Flash, FormInput, Page};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(flash): Query<Flash>,
) -> Result<Json<Page<Vec<EmployerListing>>>> {
    let employers = state.employer_service.list(&identity).await?;
    Ok(Json(Page::new(flash, employers)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    form: FormInput<CreateEmployerForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form) {
        Ok(form) => state
            .employer_service
            .create(&identity, form)
            .await
            .map(|employer| format!("Employer {} created", employer.company_name)),
        Err(e) => Err(e),
    };
    flash_redirect("/admin/employers", outcome)
}

pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Query(flash): Query<Flash>,
) -> Result<Json<Page<EmployerListing>>> {
    let employer = state.employer_service.get(&identity, id).await?;
    Ok(Json(Page::new(flash, employer)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    form: FormInput<EmployerProfileForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form).and_then(EmployerProfileForm::into_profile) {
        Ok(profile) => state
            .employer_service
            .update(&identity, id, profile)
            .await
            .map(|_| "Employer updated".to_string()),
        Err(e) => Err(e),
    };
    flash_redirect(&format!("/admin/employers/{}", id), outcome)
}

use axum::{
    extract::{Extension, Path, Query, State},
    response::Redirect,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::dto::student_dto::{AdminStudentForm, CreateStudentForm, StatusForm};
use crate::error::{flash_redirect, Result};
use crate::models::{
    status_history::StatusHistory,
    student::{StatusChange, StudentListing, StudentStatus},
    user::Identity,
};
use crate::routes::{form_input, Flash, FormInput, Page};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StudentFilter {
    pub status: Option<String>,
    #[serde(flatten)]
    pub flash: Flash,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(filter): Query<StudentFilter>,
) -> Result<Json<Page<Vec<StudentListing>>>> {
    let status = filter
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<StudentStatus>)
        .transpose()?;
    let students = state.student_service.list(&identity, status).await?;
    Ok(Json(Page::new(filter.flash, students)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    form: FormInput<CreateStudentForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form) {
        Ok(form) => state
            .student_service
            .create(&identity, form)
            .await
            .map(|student| format!("Student {} created", student.full_name())),
        Err(e) => Err(e),
    };
    flash_redirect("/admin/students", outcome)
}

pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Query(flash): Query<Flash>,
) -> Result<Json<Page<StudentListing>>> {
    let student = state.student_service.get(&identity, id).await?;
    Ok(Json(Page::new(flash, student)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    form: FormInput<AdminStudentForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form).and_then(AdminStudentForm::into_parts) {
        Ok((profile, compliance)) => state
            .student_service
            .update_by_admin(&identity, id, profile, compliance)
            .await
            .map(|_| "Student updated".to_string()),
        Err(e) => Err(e),
    };
    flash_redirect(&format!("/admin/students/{}", id), outcome)
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    form: FormInput<StatusForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form) {
        Ok(form) => state
            .student_service
            .set_status(&identity, id, &form.status)
            .await
            .map(|change| status_notice(&change)),
        Err(e) => Err(e),
    };
    flash_redirect(&format!("/admin/students/{}", id), outcome)
}

pub async fn history(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistory>>> {
    let rows = state.student_service.history(&identity, id).await?;
    Ok(Json(rows))
}

fn status_notice(change: &StatusChange) -> String {
    match (change.is_transition(), change.level_changed()) {
        (false, false) => format!("Status is already {}", change.new_status),
        (_, true) => format!(
            "Level {} completed; student moved to level {} and is {}",
            change.old_level, change.new_level, change.new_status
        ),
        (true, false) => format!(
            "Status changed from {} to {}",
            change.old_status, change.new_status
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::plan_status_change;

    #[test]
    fn notice_describes_level_completion() {
        let change = plan_status_change(StudentStatus::Active, 2, StudentStatus::CompletedLevel);
        assert_eq!(
            status_notice(&change),
            "Level 2 completed; student moved to level 3 and is Pending Re-Enrollment"
        );
    }

    #[test]
    fn notice_for_unchanged_status() {
        let change = plan_status_change(StudentStatus::OnHold, 1, StudentStatus::OnHold);
        assert_eq!(status_notice(&change), "Status is already On Hold");
    }
}

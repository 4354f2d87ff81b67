use axum::{
    extract::{Extension, Query, State},
    Json,
};

use crate::dto::dashboard_dto::{AdminDashboard, Dashboard, EmployerDashboard, StudentDashboard};
use crate::error::{Error, Result};
use crate::models::{
    document::EntityRef,
    user::{Identity, Role},
};
use crate::routes::{Flash, Page};
use crate::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(flash): Query<Flash>,
) -> Result<Json<Page<Dashboard>>> {
    let dashboard = match identity.role {
        Role::Admin => {
            let students_by_status = state.student_service.status_counts().await?;
            Dashboard::Admin(AdminDashboard {
                student_total: students_by_status.values().sum(),
                students_by_status,
                employer_total: state.employer_service.count().await?,
                pending_access_requests: state.access_request_service.pending_count().await?,
            })
        }
        Role::Student => {
            let profile = state
                .student_service
                .find_by_user(identity.user_id)
                .await?
                .ok_or_else(|| Error::NotFound("Student profile not found".to_string()))?;
            let student_id = profile.student.id;
            Dashboard::Student(StudentDashboard {
                history: state.student_service.history(&identity, student_id).await?,
                documents: state
                    .document_service
                    .list(&identity, EntityRef::student(student_id))
                    .await?,
                profile,
            })
        }
        Role::Employer => {
            let profile = state
                .employer_service
                .find_by_user(identity.user_id)
                .await?
                .ok_or_else(|| Error::NotFound("Employer profile not found".to_string()))?;
            Dashboard::Employer(EmployerDashboard {
                students: state.student_service.list_for_employer(profile.id).await?,
                documents: state
                    .document_service
                    .list(&identity, EntityRef::employer(profile.id))
                    .await?,
                profile,
            })
        }
    };
    Ok(Json(Page::new(flash, dashboard)))
}

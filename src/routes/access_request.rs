use axum::{
    extract::{Extension, Path, Query, State},
    response::Redirect,
    Json,
};
use uuid::Uuid;

use crate::dto::access_request_dto::{RegisterRequestForm, ResetRequestForm, ResolveRequestForm};
use crate::error::{flash_redirect, Result};
use crate::models::{access_request::AccessRequest, user::Identity};
use crate::routes::{form_input, Flash, FormInput, Page};
use crate::AppState;

const RECEIVED: &str = "Thanks, your request has been received. An administrator will follow up by email.";

pub async fn submit_registration(
    State(state): State<AppState>,
    form: FormInput<RegisterRequestForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form) {
        Ok(form) => state
            .access_request_service
            .submit_registration(form)
            .await
            .map(|_| RECEIVED.to_string()),
        Err(e) => Err(e),
    };
    flash_redirect("/login", outcome)
}

pub async fn submit_reset(
    State(state): State<AppState>,
    form: FormInput<ResetRequestForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form) {
        Ok(form) => state
            .access_request_service
            .submit_reset(form)
            .await
            .map(|_| RECEIVED.to_string()),
        Err(e) => Err(e),
    };
    flash_redirect("/login", outcome)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(flash): Query<Flash>,
) -> Result<Json<Page<Vec<AccessRequest>>>> {
    let requests = state.access_request_service.list(&identity).await?;
    Ok(Json(Page::new(flash, requests)))
}

pub async fn resolve(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    form: FormInput<ResolveRequestForm>,
) -> Result<Redirect> {
    let outcome = match form_input(form) {
        Ok(form) => state
            .access_request_service
            .resolve(&identity, id, &form.status)
            .await
            .map(|request| format!("Request from {} marked {}", request.email, request.status)),
        Err(e) => Err(e),
    };
    flash_redirect("/admin/access-requests", outcome)
}

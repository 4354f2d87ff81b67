use axum::{
    extract::{rejection::FormRejection, DefaultBodyLimit},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth, rate_limit::{limit_by_client, RateLimiter}};
use crate::error::{Error, Result};
use crate::AppState;

pub mod access_request;
pub mod account;
pub mod dashboard;
pub mod document;
pub mod employer;
pub mod export;
pub mod health;
pub mod session;
pub mod student;
pub mod user;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn app(state: AppState) -> Router {
    let intake_limiter = RateLimiter::per_minute(state.config.intake_per_minute);
    let upload_limit = state.config.max_upload_bytes.saturating_add(UPLOAD_OVERHEAD_BYTES);

    let intake = Router::new()
        .route("/login", post(session::login))
        .route("/access-requests/register", post(access_request::submit_registration))
        .route("/access-requests/reset-password", post(access_request::submit_reset))
        .route_layer(from_fn_with_state(intake_limiter, limit_by_client));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/login", get(session::login_page))
        .route("/logout", post(session::logout))
        .merge(intake);

    let admin = Router::new()
        .route("/admin/students", get(student::list).post(student::create))
        .route("/admin/students/:id", get(student::get).post(student::update))
        .route("/admin/students/:id/status", post(student::set_status))
        .route("/admin/students/:id/history", get(student::history))
        .route("/admin/employers", get(employer::list).post(employer::create))
        .route("/admin/employers/:id", get(employer::get).post(employer::update))
        .route("/admin/users/:id/delete", post(user::delete))
        .route("/admin/users/:id/password", post(user::set_password))
        .route("/admin/access-requests", get(access_request::list))
        .route("/admin/access-requests/:id/resolve", post(access_request::resolve))
        .route("/admin/exports/enrollees.csv", get(export::enrollees))
        .route("/admin/exports/exiters.csv", get(export::exiters))
        .route_layer(from_fn(auth::require_admin));

    let signed_in = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/account/password", post(account::change_password))
        .route("/account/profile", post(account::update_profile))
        .route(
            "/documents/:entity_type/:entity_id",
            get(document::list)
                .post(document::upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/:entity_type/:entity_id/archive", get(document::archive))
        .route("/files/:id", get(document::download))
        .route("/files/:id/delete", post(document::delete))
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), auth::require_session));

    Router::new()
        .merge(public)
        .merge(signed_in)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// `?notice=` / `?error=` left by the previous form redirect.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Flash {
    pub notice: Option<String>,
    pub error: Option<String>,
}

/// JSON view model for a page: the data plus any flash message.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub flash: Flash,
    pub data: T,
}

impl<T> Page<T> {
    pub fn new(flash: Flash, data: T) -> Self {
        Self { flash, data }
    }
}

/// A form body as received; a missing or malformed field is kept as the
/// rejection so the handler can redirect with it.
pub type FormInput<T> = std::result::Result<Form<T>, FormRejection>;

pub fn form_input<T>(input: FormInput<T>) -> Result<T> {
    input
        .map(|Form(form)| form)
        .map_err(|rejection| {
            Error::Validation(format!("Invalid form submission: {}", rejection.body_text()))
        })
}

/// `Content-Disposition` value with a quoted ASCII-only filename.
pub fn attachment(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

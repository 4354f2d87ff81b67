pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::services::{
    access_request_service::AccessRequestService,
    auth_service::{AuthService, SessionTokens},
    document_service::DocumentService,
    employer_service::EmployerService,
    export_service::ExportService,
    storage_service::StorageService,
    student_service::StudentService,
    user_service::UserService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub student_service: StudentService,
    pub employer_service: EmployerService,
    pub document_service: DocumentService,
    pub access_request_service: AccessRequestService,
    pub export_service: ExportService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let storage = StorageService::new(config.upload_dir.clone());
        let tokens = SessionTokens::new(config.session_secret.clone(), config.session_ttl_hours);

        let auth_service = AuthService::new(pool.clone(), tokens);
        let user_service = UserService::new(pool.clone(), storage.clone());
        let student_service = StudentService::new(pool.clone());
        let employer_service = EmployerService::new(pool.clone());
        let document_service =
            DocumentService::new(pool.clone(), storage, config.max_upload_bytes);
        let access_request_service = AccessRequestService::new(pool.clone());
        let export_service = ExportService::new(pool.clone());

        Self {
            pool,
            config: Arc::new(config),
            auth_service,
            user_service,
            student_service,
            employer_service,
            document_service,
            access_request_service,
            export_service,
        }
    }
}

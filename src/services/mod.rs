pub mod access_request_service;
pub mod auth_service;
pub mod document_service;
pub mod employer_service;
pub mod export_service;
pub mod storage_service;
pub mod student_service;
pub mod user_service;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{
    document::Document,
    employer::Employer,
    status_history::StatusHistory,
    student::{Student, StudentListing},
};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Admin(AdminDashboard),
    Student(StudentDashboard),
    Employer(EmployerDashboard),
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub students_by_status: BTreeMap<String, i64>,
    pub student_total: i64,
    pub employer_total: i64,
    pub pending_access_requests: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub profile: StudentListing,
    pub history: Vec<StatusHistory>,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerDashboard {
    pub profile: Employer,
    pub students: Vec<Student>,
    pub documents: Vec<Document>,
}

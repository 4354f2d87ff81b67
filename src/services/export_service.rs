use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use crate::error::{Error, Result};
use crate::models::{student::StudentStatus, user::Identity};
use crate::utils::time::us_date;

pub const ENROLLEE_HEADERS: [&str; 15] = [
    "Program Number",
    "Apprentice ID",
    "First Name",
    "Last Name",
    "Date of Birth",
    "Phone",
    "Address",
    "City",
    "State",
    "Zip",
    "Occupation",
    "Employer Name",
    "Level",
    "Status",
    "Enrollment Date",
];

pub const EXITER_HEADERS: [&str; 10] = [
    "Program Number",
    "Apprentice ID",
    "First Name",
    "Last Name",
    "Enrollment Date",
    "Exit Date",
    "Exit Type",
    "Credential Awarded",
    "Level",
    "Employer Name",
];

/// One student as the compliance reports see it.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ExportRow {
    pub rapids_program_number: Option<String>,
    pub rapids_apprentice_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub occupation: Option<String>,
    pub employer_name: Option<String>,
    pub level: i32,
    pub status: StudentStatus,
    pub enrollment_date: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    pub exit_type: Option<String>,
    pub credential: Option<String>,
}

const EXPORT_SELECT: &str = r#"
    SELECT s.rapids_program_number, s.rapids_apprentice_id, s.first_name, s.last_name,
        s.date_of_birth, s.phone, s.address_line, s.city, s.state, s.postal_code,
        s.occupation, e.company_name AS employer_name, s.level, s.status,
        s.enrollment_date, s.exit_date, s.exit_type, s.credential
    FROM students s
    LEFT JOIN employers e ON e.id = s.employer_id
"#;

#[derive(Clone)]
pub struct ExportService {
    pool: PgPool,
}

impl ExportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Students currently enrolled: enrollment date set, no exit date.
    pub async fn enrollees(&self, actor: &Identity) -> Result<Vec<u8>> {
        actor.require_admin()?;
        let rows = self
            .rows("WHERE s.enrollment_date IS NOT NULL AND s.exit_date IS NULL")
            .await?;
        tracing::info!(rows = rows.len(), actor = %actor.user_id, "Enrollee export generated");
        write_enrollee_csv(&rows)
    }

    pub async fn exiters(&self, actor: &Identity) -> Result<Vec<u8>> {
        actor.require_admin()?;
        let rows = self.rows("WHERE s.exit_date IS NOT NULL").await?;
        tracing::info!(rows = rows.len(), actor = %actor.user_id, "Exiter export generated");
        write_exiter_csv(&rows)
    }

    async fn rows(&self, filter: &str) -> Result<Vec<ExportRow>> {
        let rows = sqlx::query_as::<_, ExportRow>(&format!(
            "{EXPORT_SELECT} {filter} ORDER BY s.last_name, s.first_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

pub fn write_enrollee_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv_writer();
    writer.write_record(ENROLLEE_HEADERS)?;
    for row in rows {
        let date_of_birth = us_date(row.date_of_birth);
        let level = row.level.to_string();
        let enrollment_date = us_date(row.enrollment_date);
        let record: [&str; 15] = [
            text(&row.rapids_program_number),
            text(&row.rapids_apprentice_id),
            &row.first_name,
            &row.last_name,
            &date_of_birth,
            text(&row.phone),
            text(&row.address_line),
            text(&row.city),
            text(&row.state),
            text(&row.postal_code),
            text(&row.occupation),
            text(&row.employer_name),
            &level,
            row.status.as_str(),
            &enrollment_date,
        ];
        writer.write_record(record)?;
    }
    finish(writer)
}

pub fn write_exiter_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv_writer();
    writer.write_record(EXITER_HEADERS)?;
    for row in rows {
        let enrollment_date = us_date(row.enrollment_date);
        let exit_date = us_date(row.exit_date);
        let level = row.level.to_string();
        let record: [&str; 10] = [
            text(&row.rapids_program_number),
            text(&row.rapids_apprentice_id),
            &row.first_name,
            &row.last_name,
            &enrollment_date,
            &exit_date,
            text(&row.exit_type),
            text(&row.credential),
            &level,
            text(&row.employer_name),
        ];
        writer.write_record(record)?;
    }
    finish(writer)
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to flush CSV export: {}", e)))
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExportRow {
        ExportRow {
            rapids_program_number: Some("2024-XY-001".into()),
            rapids_apprentice_id: Some("A-1".into()),
            first_name: "Ana".into(),
            last_name: "Diaz".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2001, 2, 3),
            city: Some("Tulsa".into()),
            employer_name: Some("Acme, Inc.".into()),
            level: 2,
            status: StudentStatus::Active,
            enrollment_date: NaiveDate::from_ymd_opt(2024, 9, 1),
            ..Default::default()
        }
    }

    #[test]
    fn empty_enrollee_export_is_header_only() {
        let bytes = write_enrollee_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Program Number,Apprentice ID,First Name,Last Name,Date of Birth,Phone,Address,\
             City,State,Zip,Occupation,Employer Name,Level,Status,Enrollment Date\r\n"
        );
    }

    #[test]
    fn empty_exiter_export_is_header_only() {
        let bytes = write_exiter_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Program Number,Apprentice ID,First Name,Last Name,Enrollment Date,Exit Date,\
             Exit Type,Credential Awarded,Level,Employer Name\r\n"
        );
    }

    #[test]
    fn enrollee_row_uses_us_dates_and_quotes_commas() {
        let bytes = write_enrollee_csv(&[sample()]).unwrap();
        let out = String::from_utf8(bytes).unwrap();
        let row = out.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "2024-XY-001,A-1,Ana,Diaz,02/03/2001,,,Tulsa,,,,\"Acme, Inc.\",2,Active,09/01/2024"
        );
    }

    #[test]
    fn exiter_row_leaves_absent_values_empty() {
        let row = ExportRow {
            exit_date: NaiveDate::from_ymd_opt(2025, 5, 30),
            exit_type: Some("Completed".into()),
            credential: None,
            status: StudentStatus::Completed,
            ..sample()
        };
        let bytes = write_exiter_csv(&[row]).unwrap();
        let out = String::from_utf8(bytes).unwrap();
        assert_eq!(
            out.lines().nth(1).unwrap(),
            "2024-XY-001,A-1,Ana,Diaz,09/01/2024,05/30/2025,Completed,,2,\"Acme, Inc.\""
        );
    }
}

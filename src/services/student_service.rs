use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::dto::student_dto::{CreateStudentForm, StudentCompliance, StudentProfile};
use crate::error::{Error, Result};
use crate::models::{
    status_history::StatusHistory,
    student::{plan_status_change, StatusChange, Student, StudentListing, StudentStatus},
    user::{Identity, Role},
};
use crate::services::user_service::insert_user;

const STUDENT_COLUMNS: &str = r#"
    s.id, s.user_id, s.employer_id, s.first_name, s.last_name, s.date_of_birth, s.phone,
    s.address_line, s.city, s.state, s.postal_code, s.occupation, s.level, s.status,
    s.rapids_program_number, s.rapids_apprentice_id, s.enrollment_date, s.exit_date,
    s.exit_type, s.credential, s.created_at, s.updated_at
"#;

#[derive(Clone)]
pub struct StudentService {
    pool: PgPool,
}

impl StudentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the login and the profile together; a duplicate email leaves
    /// nothing behind.
    pub async fn create(&self, actor: &Identity, form: CreateStudentForm) -> Result<Student> {
        actor.require_admin()?;
        validator::Validate::validate(&form)?;
        let employer_id = form.employer_id()?;

        let mut tx = self.pool.begin().await?;
        if let Some(employer_id) = employer_id {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM employers WHERE id = $1")
                .bind(employer_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(Error::Validation("Select a valid employer".to_string()));
            }
        }

        let user = insert_user(&mut tx, &form.email, &form.password, Role::Student).await?;
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students AS s (user_id, employer_id, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(employer_id)
        .bind(form.first_name.trim())
        .bind(form.last_name.trim())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(student_id = %student.id, user_id = %user.id, actor = %actor.user_id, "Student created");
        Ok(student)
    }

    pub async fn get(&self, actor: &Identity, id: Uuid) -> Result<StudentListing> {
        let listing = self.listing(id).await?;
        actor.require_owner_or_admin(listing.student.user_id)?;
        Ok(listing)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<StudentListing>> {
        let listing = sqlx::query_as::<_, StudentListing>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}, u.email, e.company_name AS employer_name
            FROM students s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN employers e ON e.id = s.employer_id
            WHERE s.user_id = $1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    pub async fn list(&self, actor: &Identity, status: Option<StudentStatus>) -> Result<Vec<StudentListing>> {
        actor.require_admin()?;
        let students = sqlx::query_as::<_, StudentListing>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}, u.email, e.company_name AS employer_name
            FROM students s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN employers e ON e.id = s.employer_id
            WHERE ($1::text IS NULL OR s.status = $1)
            ORDER BY s.last_name, s.first_name
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn list_for_employer(&self, employer_id: Uuid) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM students s
            WHERE s.employer_id = $1
            ORDER BY s.last_name, s.first_name
            "#
        ))
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn update_by_admin(
        &self,
        actor: &Identity,
        id: Uuid,
        profile: StudentProfile,
        compliance: StudentCompliance,
    ) -> Result<Student> {
        actor.require_admin()?;
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE students AS s SET
                first_name = $1, last_name = $2, date_of_birth = $3, phone = $4,
                address_line = $5, city = $6, state = $7, postal_code = $8, occupation = $9,
                employer_id = $10, rapids_program_number = $11, rapids_apprentice_id = $12,
                enrollment_date = $13, exit_date = $14, exit_type = $15, credential = $16,
                updated_at = NOW()
            WHERE s.id = $17
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.date_of_birth)
        .bind(&profile.phone)
        .bind(&profile.address_line)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.postal_code)
        .bind(&profile.occupation)
        .bind(compliance.employer_id)
        .bind(&compliance.rapids_program_number)
        .bind(&compliance.rapids_apprentice_id)
        .bind(compliance.enrollment_date)
        .bind(compliance.exit_date)
        .bind(&compliance.exit_type)
        .bind(&compliance.credential)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_employer_fk)?
        .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;

        tracing::info!(student_id = %id, actor = %actor.user_id, "Student updated by admin");
        Ok(student)
    }

    /// Students edit their identity and contact fields only; status, level
    /// and compliance fields stay with the admins.
    pub async fn update_own_profile(&self, identity: &Identity, profile: StudentProfile) -> Result<Student> {
        if identity.role != Role::Student {
            return Err(Error::Forbidden);
        }
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE students AS s SET
                first_name = $1, last_name = $2, date_of_birth = $3, phone = $4,
                address_line = $5, city = $6, state = $7, postal_code = $8, occupation = $9,
                updated_at = NOW()
            WHERE s.user_id = $10
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.date_of_birth)
        .bind(&profile.phone)
        .bind(&profile.address_line)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.postal_code)
        .bind(&profile.occupation)
        .bind(identity.user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Student profile not found".to_string()))?;

        tracing::info!(student_id = %student.id, "Student updated own profile");
        Ok(student)
    }

    /// Applies a requested status. The student row is locked for the duration
    /// so concurrent transitions are serialized and each one sees the status
    /// the previous one wrote. Exactly one history row is appended when the
    /// status actually changes.
    pub async fn set_status(&self, actor: &Identity, id: Uuid, requested: &str) -> Result<StatusChange> {
        actor.require_admin()?;
        let requested: StudentStatus = requested.parse()?;

        let mut tx = self.pool.begin().await?;
        let (current, level): (StudentStatus, i32) =
            sqlx::query_as("SELECT status, level FROM students WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;

        let change = plan_status_change(current, level, requested);
        if change.is_transition() || change.level_changed() {
            sqlx::query(
                "UPDATE students SET status = $1, level = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(change.new_status)
            .bind(change.new_level)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        if change.is_transition() {
            sqlx::query(
                r#"
                INSERT INTO student_status_history (student_id, old_status, new_status, changed_by_user_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(change.old_status)
            .bind(change.new_status)
            .bind(actor.user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(
            student_id = %id,
            actor = %actor.user_id,
            old_status = %change.old_status,
            new_status = %change.new_status,
            old_level = change.old_level,
            new_level = change.new_level,
            "Student status applied"
        );
        Ok(change)
    }

    pub async fn history(&self, actor: &Identity, id: Uuid) -> Result<Vec<StatusHistory>> {
        let owner: (Uuid,) = sqlx::query_as("SELECT user_id FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        actor.require_owner_or_admin(owner.0)?;

        let rows = sqlx::query_as::<_, StatusHistory>(
            r#"
            SELECT id, student_id, old_status, new_status, changed_by_user_id, changed_at
            FROM student_status_history
            WHERE student_id = $1
            ORDER BY changed_at ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn status_counts(&self) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(StudentStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM students GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts: BTreeMap<String, i64> = StudentStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for (status, count) in rows {
            counts.insert(status.as_str().to_string(), count);
        }
        Ok(counts)
    }

    async fn listing(&self, id: Uuid) -> Result<StudentListing> {
        sqlx::query_as::<_, StudentListing>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}, u.email, e.company_name AS employer_name
            FROM students s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN employers e ON e.id = s.employer_id
            WHERE s.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Student not found".to_string()))
    }
}

fn map_employer_fk(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
            Error::Validation("Select a valid employer".to_string())
        }
        _ => Error::from(err),
    }
}

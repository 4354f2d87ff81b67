use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::employer_dto::{CreateEmployerForm, EmployerProfile};
use crate::error::{Error, Result};
use crate::models::{
    employer::{Employer, EmployerListing},
    user::{Identity, Role},
};
use crate::services::user_service::insert_user;

const EMPLOYER_COLUMNS: &str = r#"
    e.id, e.user_id, e.company_name, e.contact_name, e.contact_phone,
    e.address_line, e.city, e.state, e.postal_code, e.created_at, e.updated_at
"#;

#[derive(Clone)]
pub struct EmployerService {
    pool: PgPool,
}

impl EmployerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: &Identity, form: CreateEmployerForm) -> Result<Employer> {
        actor.require_admin()?;
        validator::Validate::validate(&form)?;

        let mut tx = self.pool.begin().await?;
        let user = insert_user(&mut tx, &form.email, &form.password, Role::Employer).await?;
        let employer = sqlx::query_as::<_, Employer>(&format!(
            r#"
            INSERT INTO employers AS e (user_id, company_name, contact_name)
            VALUES ($1, $2, $3)
            RETURNING {EMPLOYER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(form.company_name.trim())
        .bind(&form.contact_name)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(employer_id = %employer.id, user_id = %user.id, actor = %actor.user_id, "Employer created");
        Ok(employer)
    }

    pub async fn get(&self, actor: &Identity, id: Uuid) -> Result<EmployerListing> {
        let listing = sqlx::query_as::<_, EmployerListing>(&format!(
            r#"
            SELECT {EMPLOYER_COLUMNS}, u.email,
                (SELECT COUNT(*) FROM students s WHERE s.employer_id = e.id) AS student_count
            FROM employers e
            JOIN users u ON u.id = e.user_id
            WHERE e.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Employer not found".to_string()))?;
        actor.require_owner_or_admin(listing.employer.user_id)?;
        Ok(listing)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Employer>> {
        let employer = sqlx::query_as::<_, Employer>(&format!(
            "SELECT {EMPLOYER_COLUMNS} FROM employers e WHERE e.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employer)
    }

    pub async fn list(&self, actor: &Identity) -> Result<Vec<EmployerListing>> {
        actor.require_admin()?;
        let employers = sqlx::query_as::<_, EmployerListing>(&format!(
            r#"
            SELECT {EMPLOYER_COLUMNS}, u.email,
                (SELECT COUNT(*) FROM students s WHERE s.employer_id = e.id) AS student_count
            FROM employers e
            JOIN users u ON u.id = e.user_id
            ORDER BY e.company_name
            "#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(employers)
    }

    /// Admins may edit any employer; an employer only its own record.
    pub async fn update(&self, actor: &Identity, id: Uuid, profile: EmployerProfile) -> Result<Employer> {
        let owner: (Uuid,) = sqlx::query_as("SELECT user_id FROM employers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Employer not found".to_string()))?;
        actor.require_owner_or_admin(owner.0)?;

        let employer = sqlx::query_as::<_, Employer>(&format!(
            r#"
            UPDATE employers AS e SET
                company_name = $1, contact_name = $2, contact_phone = $3,
                address_line = $4, city = $5, state = $6, postal_code = $7,
                updated_at = NOW()
            WHERE e.id = $8
            RETURNING {EMPLOYER_COLUMNS}
            "#
        ))
        .bind(&profile.company_name)
        .bind(&profile.contact_name)
        .bind(&profile.contact_phone)
        .bind(&profile.address_line)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.postal_code)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(employer_id = %id, actor = %actor.user_id, "Employer updated");
        Ok(employer)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::access_request_dto::{RegisterRequestForm, ResetRequestForm};
use crate::error::{Error, Result};
use crate::models::{
    access_request::{AccessRequest, RequestStatus, RequestType},
    user::{normalize_email, Identity, Role},
};

const REQUEST_COLUMNS: &str = r#"
    id, request_type, email, requested_role, note, status, created_at, resolved_at, resolved_by
"#;

/// Queue of registration and password-reset requests submitted from the
/// public forms. Nothing here creates accounts; an admin actions each
/// request by hand and then resolves it.
#[derive(Clone)]
pub struct AccessRequestService {
    pool: PgPool,
}

impl AccessRequestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn submit_registration(&self, form: RegisterRequestForm) -> Result<AccessRequest> {
        validator::Validate::validate(&form)?;
        let role: Role = form.requested_role.parse()?;
        if role == Role::Admin {
            return Err(Error::Validation(
                "Registration is only open to students and employers".to_string(),
            ));
        }
        self.insert(RequestType::Register, &form.email, Some(role), form.note.as_deref())
            .await
    }

    pub async fn submit_reset(&self, form: ResetRequestForm) -> Result<AccessRequest> {
        validator::Validate::validate(&form)?;
        self.insert(RequestType::ResetPassword, &form.email, None, form.note.as_deref())
            .await
    }

    pub async fn list(&self, actor: &Identity) -> Result<Vec<AccessRequest>> {
        actor.require_admin()?;
        let requests = sqlx::query_as::<_, AccessRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM access_requests
            ORDER BY (status = 'pending') DESC, created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn resolve(&self, actor: &Identity, id: Uuid, status: &str) -> Result<AccessRequest> {
        actor.require_admin()?;
        let status: RequestStatus = status.parse()?;
        if status == RequestStatus::Pending {
            return Err(Error::Validation(
                "Resolve a request as completed or dismissed".to_string(),
            ));
        }

        let resolved = sqlx::query_as::<_, AccessRequest>(&format!(
            r#"
            UPDATE access_requests
            SET status = $1, resolved_at = NOW(), resolved_by = $2
            WHERE id = $3 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(actor.user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match resolved {
            Some(request) => {
                tracing::info!(request_id = %id, status = %status, actor = %actor.user_id, "Access request resolved");
                Ok(request)
            }
            None => {
                let exists: Option<(Uuid,)> =
                    sqlx::query_as("SELECT id FROM access_requests WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                match exists {
                    Some(_) => Err(Error::Validation(
                        "This request has already been resolved".to_string(),
                    )),
                    None => Err(Error::NotFound("Access request not found".to_string())),
                }
            }
        }
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM access_requests WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    async fn insert(
        &self,
        request_type: RequestType,
        email: &str,
        requested_role: Option<Role>,
        note: Option<&str>,
    ) -> Result<AccessRequest> {
        let request = sqlx::query_as::<_, AccessRequest>(&format!(
            r#"
            INSERT INTO access_requests (request_type, email, requested_role, note)
            VALUES ($1, $2, $3, $4)
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(request_type)
        .bind(normalize_email(email))
        .bind(requested_role)
        .bind(note.map(str::trim))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(request_id = %request.id, request_type = %request_type, "Access request submitted");
        Ok(request)
    }
}

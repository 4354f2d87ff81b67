use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(argon2::password_hash::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors the user caused and can correct by resubmitting.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Invalid(_)
                | Error::Multipart(_)
                | Error::InvalidCredentials
                | Error::Forbidden
                | Error::Duplicate(_)
                | Error::NotFound(_)
        )
    }

    /// Message safe to show back to the user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Invalid(errors) => describe_validation(errors),
            other if other.is_expected() => other.to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

fn describe_validation(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
    fields.sort_unstable();
    format!("Please check the following fields: {}", fields.join(", "))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Unauthenticated => return Redirect::to("/login").into_response(),
            Error::Validation(_) | Error::Invalid(_) | Error::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(error = %self, "Unhandled request failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.user_message()).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                Error::Duplicate("A record with these details already exists".to_string())
            }
            other => Error::Database(other),
        }
    }
}

impl From<crate::models::UnknownValue> for Error {
    fn from(err: crate::models::UnknownValue) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::PasswordHash(err)
    }
}

/// Outcome of a form submission: redirect back to `to` with either the
/// success notice or the user-facing error message in the query string.
/// Unexpected failures still propagate to the top-level error response.
pub fn flash_redirect(to: &str, outcome: Result<String>) -> Result<Redirect> {
    match outcome {
        Ok(notice) => Ok(Redirect::to(&with_message(to, "notice", &notice))),
        Err(Error::Unauthenticated) => Err(Error::Unauthenticated),
        Err(err) if err.is_expected() => {
            tracing::debug!(error = %err, target_path = to, "Form rejected");
            Ok(Redirect::to(&with_message(to, "error", &err.user_message())))
        }
        Err(err) => Err(err),
    }
}

fn with_message(to: &str, key: &str, message: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    let separator = if to.contains('?') { '&' } else { '?' };
    format!("{to}{separator}{key}={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    #[test]
    fn success_redirect_carries_notice() {
        let redirect = flash_redirect("/admin/students", Ok("Student created".into())).unwrap();
        assert_eq!(location(redirect), "/admin/students?notice=Student+created");
    }

    #[test]
    fn expected_error_becomes_redirect_with_message() {
        let outcome = Err(Error::Duplicate("A user with this email already exists".into()));
        let redirect = flash_redirect("/admin/students?tab=new", outcome).unwrap();
        assert_eq!(
            location(redirect),
            "/admin/students?tab=new&error=A+user+with+this+email+already+exists"
        );
    }

    #[test]
    fn unexpected_error_propagates() {
        let outcome = Err(Error::Internal("disk on fire".into()));
        let err = flash_redirect("/dashboard", outcome).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = Error::Internal("connection string leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            Error::Internal("connection string leaked".into()).user_message(),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let response = Error::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    #[test]
    fn forbidden_has_no_detail() {
        let response = Error::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::Forbidden.user_message(), "Forbidden");
    }
}

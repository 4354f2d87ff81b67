use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

const MIN_SESSION_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub intake_per_minute: u32,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let session_secret = vars.required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(Error::Config(format!(
                "SESSION_SECRET must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        let admin_password = vars.required("ADMIN_PASSWORD")?;
        if admin_password.chars().count() < 8 {
            return Err(Error::Config(
                "ADMIN_PASSWORD must be at least 8 characters".to_string(),
            ));
        }

        let max_upload_mb: usize = vars.parsed_or("MAX_UPLOAD_MB", 25)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| Error::Config("MAX_UPLOAD_MB is too large".to_string()))?;
        let log_format = vars.optional("LOG_FORMAT").unwrap_or_else(|| "text".to_string());

        Ok(Self {
            server_address: vars
                .optional("SERVER_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: vars.required("DATABASE_URL")?,
            session_secret,
            session_ttl_hours: vars.parsed_or("SESSION_TTL_HOURS", 12)?,
            secure_cookies: vars.parsed_or("SECURE_COOKIES", true)?,
            admin_email: vars.required("ADMIN_EMAIL")?.trim().to_lowercase(),
            admin_password,
            upload_dir: vars
                .optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            max_upload_bytes,
            intake_per_minute: vars.parsed_or("INTAKE_PER_MINUTE", 20)?,
            json_logs: log_format.eq_ignore_ascii_case("json"),
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)
            .ok_or_else(|| Error::Config(format!("Missing environment variable: {}", name)))
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/portal".to_string()),
            ("SESSION_SECRET", "x".repeat(48)),
            ("ADMIN_EMAIL", " Admin@Example.com ".to_string()),
            ("ADMIN_PASSWORD", "correct horse".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Config> {
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = load(&base()).unwrap();
        assert_eq!(config.server_address, "0.0.0.0:8080");
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.session_ttl_hours, 12);
        assert_eq!(config.admin_email, "admin@example.com");
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert!(config.secure_cookies);
        assert!(!config.json_logs);
    }

    #[test]
    fn oversized_upload_limit_is_rejected() {
        let mut vars = base();
        vars.insert("MAX_UPLOAD_MB", usize::MAX.to_string());
        assert!(matches!(load(&vars), Err(Error::Config(msg)) if msg.contains("MAX_UPLOAD_MB")));

        vars.insert("MAX_UPLOAD_MB", "2".to_string());
        assert_eq!(load(&vars).unwrap().max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn short_session_secret_is_rejected() {
        let mut vars = base();
        vars.insert("SESSION_SECRET", "secret".to_string());
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("SESSION_SECRET")));
    }

    #[test]
    fn missing_database_url_is_reported_by_name() {
        let mut vars = base();
        vars.remove("DATABASE_URL");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("DATABASE_URL")));
    }

    #[test]
    fn unparsable_number_is_a_config_error() {
        let mut vars = base();
        vars.insert("MAX_UPLOAD_MB", "lots".to_string());
        assert!(matches!(load(&vars), Err(Error::Config(_))));
    }

    #[test]
    fn overrides_are_honoured() {
        let mut vars = base();
        vars.insert("MAX_UPLOAD_MB", "5".to_string());
        vars.insert("SECURE_COOKIES", "false".to_string());
        vars.insert("LOG_FORMAT", "JSON".to_string());
        vars.insert("UPLOAD_DIR", "/srv/portal/files".to_string());
        let config = load(&vars).unwrap();
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(!config.secure_cookies);
        assert!(config.json_logs);
        assert_eq!(config.upload_dir, PathBuf::from("/srv/portal/files"));
    }
}

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_hours: i64,
    pub verify_ttl_seconds: i64,
}

/// SMTP transport settings. Absent when MAIL_SERVER is not set, in which
/// case outbound mail is dropped with a log line instead of being sent.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL embedded into verification links.
    pub server_base_url: String,
    pub jwt: JwtConfig,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let server_base_url =
            std::env::var("SERVER_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "journal-api".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "journal-users".into()),
            access_ttl_hours: std::env::var("JWT_ACCESS_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
            refresh_ttl_hours: std::env::var("JWT_REFRESH_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(72),
            verify_ttl_seconds: std::env::var("JWT_VERIFY_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(300),
        };

        let smtp = match std::env::var("MAIL_SERVER") {
            Ok(server) => Some(SmtpConfig {
                server,
                port: std::env::var("MAIL_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(587),
                username: std::env::var("MAIL_USERNAME").unwrap_or_default(),
                password: std::env::var("MAIL_PASSWORD").unwrap_or_default(),
                from: std::env::var("MAIL_DEFAULT_SENDER")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            server_base_url,
            jwt,
            smtp,
        })
    }
}

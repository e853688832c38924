use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Auth service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// 32-byte key for encrypting TOTP secrets at rest. Env var:
    /// `SECRET_ENCRYPTION_KEY` (base64 of exactly 32 bytes).
    pub secret_encryption_key: [u8; 32],
    /// Issuer label shown in authenticator apps. Env var: `TOTP_ISSUER`.
    pub totp_issuer: String,
    /// Cookie domain attribute (root domain, e.g. "example.com").
    pub cookie_domain: String,
    /// TCP port to listen on (default 3100). Env var: `AUTH_PORT`.
    pub auth_port: u16,
    /// Whether a password change revokes every session except the caller's
    /// (default true). Env var: `REVOKE_SESSIONS_ON_PASSWORD_CHANGE`.
    pub revoke_sessions_on_password_change: bool,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let key_b64 = std::env::var("SECRET_ENCRYPTION_KEY").expect("SECRET_ENCRYPTION_KEY");
        let key_bytes = STANDARD
            .decode(key_b64)
            .expect("SECRET_ENCRYPTION_KEY must be valid base64");
        let secret_encryption_key: [u8; 32] = key_bytes
            .try_into()
            .expect("SECRET_ENCRYPTION_KEY must decode to exactly 32 bytes");

        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            secret_encryption_key,
            totp_issuer: std::env::var("TOTP_ISSUER").unwrap_or_else(|_| "Vantra".to_owned()),
            cookie_domain: std::env::var("COOKIE_DOMAIN").expect("COOKIE_DOMAIN"),
            auth_port: std::env::var("AUTH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3100),
            revoke_sessions_on_password_change: std::env::var(
                "REVOKE_SESSIONS_ON_PASSWORD_CHANGE",
            )
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true),
        }
    }
}

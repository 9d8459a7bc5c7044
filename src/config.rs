use std::env;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// One year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/// Token signing settings shared with request extractors.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let token_ttl_hours = parse_token_ttl_hours(env::var("TOKEN_TTL_HOURS").ok().as_deref());
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            token_ttl_hours,
        })
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: self.token_ttl_hours,
        }
    }
}

/// Missing, unparsable or non-positive values fall back to the default;
/// oversized values are clamped.
fn parse_token_ttl_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|h| h.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .map(|h| h.min(MAX_TOKEN_TTL_HOURS))
        .unwrap_or(DEFAULT_TOKEN_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ttl_defaults_when_unset_or_invalid() {
        assert_eq!(parse_token_ttl_hours(None), DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(parse_token_ttl_hours(Some("soon")), DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(parse_token_ttl_hours(Some("0")), DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(parse_token_ttl_hours(Some("-3")), DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(parse_token_ttl_hours(Some(" 48 ")), 48);
    }

    #[test]
    fn token_ttl_is_clamped() {
        assert_eq!(
            parse_token_ttl_hours(Some("3000000000000000")),
            MAX_TOKEN_TTL_HOURS
        );
    }
}

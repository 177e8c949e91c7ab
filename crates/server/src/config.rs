use std::{env, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub audit_database_url: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub catalog: CatalogConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
    pub igdb_token_url: String,
    pub igdb_api_url: String,
    pub omdb_api_key: Option<String>,
    pub omdb_api_url: String,
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            igdb_client_id: None,
            igdb_client_secret: None,
            igdb_token_url: "https://id.twitch.tv/oauth2/token".to_string(),
            igdb_api_url: "https://api.igdb.com/v4".to_string(),
            omdb_api_key: None,
            omdb_api_url: "https://www.omdbapi.com/".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = CatalogConfig::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./data/retrorewind.db?mode=rwc".to_string()),
            audit_database_url: lookup("AUDIT_DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./data/analytics.db?mode=rwc".to_string()),
            jwt_secret: lookup("JWT_SECRET")
                .unwrap_or_else(|| "development-secret-change-in-production".to_string()),
            session_ttl_hours: lookup("SESSION_TTL_HOURS")
                .and_then(|h| h.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24 * 7),
            catalog: CatalogConfig {
                igdb_client_id: non_empty("IGDB_CLIENT_ID"),
                igdb_client_secret: non_empty("IGDB_CLIENT_SECRET"),
                igdb_token_url: lookup("IGDB_TOKEN_URL").unwrap_or(defaults.igdb_token_url),
                igdb_api_url: lookup("IGDB_API_URL").unwrap_or(defaults.igdb_api_url),
                omdb_api_key: non_empty("OMDB_API_KEY"),
                omdb_api_url: lookup("OMDB_API_URL").unwrap_or(defaults.omdb_api_url),
                timeout: lookup("CATALOG_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
            },
        }
    }
}

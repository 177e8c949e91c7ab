//! Live media search against the external game (IGDB) and movie (OMDb) catalogs.
//!
//! Both upstream shapes are normalized into [`MediaSummary`]. The IGDB access
//! token is obtained with the client-credentials grant and cached until it is
//! within [`TOKEN_REFRESH_MARGIN_SECS`] of expiring.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{config::CatalogConfig, db::models::MediaType};

pub const PLACEHOLDER_COVER_URL: &str = "https://placehold.co/200x280?text=No+Cover";
pub const MISSING_DATE: &str = "—";
pub const MISSING_SUMMARY: &str = "No summary available.";
pub const MOVIE_PLATFORMS: [&str; 2] = ["Theaters", "Streaming"];

const IGDB_COVER_TEMPLATE: &str = "https://images.igdb.com/igdb/image/upload/t_cover_small_2x";
const IGDB_RESULT_LIMIT: u32 = 12;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: String,
    pub title: String,
    pub year: String,
    pub platforms: Vec<String>,
    pub summary: String,
    #[serde(rename = "coverUrl")]
    pub cover_url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Upstream answered with an error status, timed out, or could not be reached.
    #[error("{catalog} unavailable: {detail}")]
    Unavailable {
        catalog: &'static str,
        detail: String,
    },

    #[error("{0}")]
    Internal(String),
}

impl CatalogError {
    fn from_reqwest(catalog: &'static str, err: reqwest::Error) -> Self {
        if err.is_status() || err.is_timeout() || err.is_connect() || err.is_request() {
            CatalogError::Unavailable {
                catalog,
                detail: err.to_string(),
            }
        } else {
            CatalogError::Internal(format!("{catalog} response could not be read: {err}"))
        }
    }
}

#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn search_games(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError>;
    async fn search_movies(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError>;
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IgdbGame {
    id: u64,
    name: Option<String>,
    first_release_date: Option<i64>,
    platforms: Option<Vec<IgdbPlatform>>,
    summary: Option<String>,
    cover: Option<IgdbCover>,
}

#[derive(Debug, Deserialize)]
struct IgdbPlatform {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IgdbCover {
    image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OmdbSearch {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Search", default)]
    search: Vec<OmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct OmdbMovie {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

/// HTTP-backed catalog gateway.
pub struct CatalogGateway {
    client: Client,
    config: CatalogConfig,
    token: RwLock<Option<AccessToken>>,
}

impl CatalogGateway {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let (client_id, client_secret) = self.igdb_credentials()?;
        debug!("Requesting IGDB access token");

        let response = self
            .client
            .post(&self.config.igdb_token_url)
            .query(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CatalogError::from_reqwest("igdb", e))?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::from_reqwest("igdb", e))?;

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let token = AccessToken {
            value: body.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        };
        info!("Refreshed IGDB access token (expires at {})", token.expires_at);

        let value = token.value.clone();
        *self.token.write().await = Some(token);
        Ok(value)
    }

    fn igdb_credentials(&self) -> Result<(&str, &str), CatalogError> {
        match (
            self.config.igdb_client_id.as_deref(),
            self.config.igdb_client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(CatalogError::Internal(
                "IGDB client credentials are not configured".to_string(),
            )),
        }
    }
}

#[async_trait]
impl MediaCatalog for CatalogGateway {
    async fn search_games(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.access_token().await?;
        let (client_id, _) = self.igdb_credentials()?;
        let url = format!("{}/games", self.config.igdb_api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .body(igdb_search_body(query))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("IGDB search failed: {}", e);
                CatalogError::from_reqwest("igdb", e)
            })?;

        let games: Vec<IgdbGame> = response
            .json()
            .await
            .map_err(|e| CatalogError::from_reqwest("igdb", e))?;

        Ok(normalize_games(games))
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.config.omdb_api_key.as_deref().ok_or_else(|| {
            CatalogError::Internal("OMDb API key is not configured".to_string())
        })?;

        let response = self
            .client
            .get(&self.config.omdb_api_url)
            .query(&[("apikey", api_key), ("s", query)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("OMDb search failed: {}", e);
                CatalogError::from_reqwest("omdb", e)
            })?;

        let search: OmdbSearch = response
            .json()
            .await
            .map_err(|e| CatalogError::from_reqwest("omdb", e))?;

        Ok(normalize_movies(search))
    }
}

fn igdb_search_body(query: &str) -> String {
    let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "search \"{escaped}\"; fields name, first_release_date, platforms.name, summary, cover.image_id; limit {IGDB_RESULT_LIMIT};"
    )
}

/// Renders an epoch-seconds release date as `YYYY-MM-DD` (UTC).
pub fn format_release_date(timestamp: Option<i64>) -> String {
    timestamp
        .filter(|ts| *ts != 0)
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| MISSING_DATE.to_string())
}

pub fn igdb_cover_url(image_id: Option<&str>) -> String {
    match image_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{IGDB_COVER_TEMPLATE}/{id}.jpg"),
        None => PLACEHOLDER_COVER_URL.to_string(),
    }
}

pub fn omdb_poster_url(poster: Option<&str>) -> String {
    match poster.map(str::trim) {
        Some(url) if !url.is_empty() && url != "N/A" => url.to_string(),
        _ => PLACEHOLDER_COVER_URL.to_string(),
    }
}

pub(crate) fn normalize_games(games: Vec<IgdbGame>) -> Vec<MediaSummary> {
    games
        .into_iter()
        .map(|game| MediaSummary {
            id: game.id.to_string(),
            title: game.name.unwrap_or_default(),
            year: format_release_date(game.first_release_date),
            platforms: game
                .platforms
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.name.filter(|n| !n.is_empty()))
                .collect(),
            summary: game
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| MISSING_SUMMARY.to_string()),
            cover_url: igdb_cover_url(game.cover.as_ref().and_then(|c| c.image_id.as_deref())),
            media_type: MediaType::Game,
        })
        .collect()
}

pub(crate) fn normalize_movies(search: OmdbSearch) -> Vec<MediaSummary> {
    if search.response.as_deref() != Some("True") {
        return Vec::new();
    }

    search
        .search
        .into_iter()
        .map(|movie| MediaSummary {
            id: movie.imdb_id,
            title: movie.title.unwrap_or_default(),
            year: movie.year.unwrap_or_else(|| MISSING_DATE.to_string()),
            platforms: MOVIE_PLATFORMS.iter().map(|p| p.to_string()).collect(),
            summary: MISSING_SUMMARY.to_string(),
            cover_url: omdb_poster_url(movie.poster.as_deref()),
            media_type: MediaType::Movie,
        })
        .collect()
}

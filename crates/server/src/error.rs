use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{db::models::CollectionKind, services::catalog::CatalogError};

pub type Result<T> = std::result::Result<T, AppError>;

/// Coarse error classes, one per HTTP status the API emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("required fields are missing")]
    MissingFields,

    #[error("stars are required")]
    MissingStars,

    #[error("stars must be between 1 and 5")]
    InvalidStars,

    #[error("malformed id")]
    InvalidId,

    #[error("unknown media type: {0}")]
    InvalidMediaType(String),

    #[error("user does not exist")]
    InvalidUser,

    #[error("malformed request body: {0}")]
    InvalidBody(String),

    #[error("malformed query string: {0}")]
    InvalidQuery(String),

    #[error("email already registered")]
    EmailExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired session token")]
    Unauthorized,

    #[error("caller does not own this resource")]
    Forbidden,

    #[error("user not found")]
    UserNotFound,

    #[error("item not found")]
    ItemNotFound,

    #[error("rating not found")]
    RatingNotFound,

    #[error("thread not found")]
    ThreadNotFound,

    #[error("comment not found")]
    CommentNotFound,

    #[error("route not found")]
    RouteNotFound,

    #[error("item already in {0}")]
    AlreadyInCollection(CollectionKind),

    #[error("media already rated by this user")]
    DuplicateRating { rating_id: String },

    #[error("{catalog} request failed: {detail}")]
    CatalogUnavailable {
        catalog: &'static str,
        detail: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingFields
            | AppError::MissingStars
            | AppError::InvalidStars
            | AppError::InvalidId
            | AppError::InvalidMediaType(_)
            | AppError::InvalidUser
            | AppError::InvalidBody(_)
            | AppError::InvalidQuery(_)
            | AppError::EmailExists => ErrorKind::Validation,
            AppError::InvalidCredentials | AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::UserNotFound
            | AppError::ItemNotFound
            | AppError::RatingNotFound
            | AppError::ThreadNotFound
            | AppError::CommentNotFound
            | AppError::RouteNotFound => ErrorKind::NotFound,
            AppError::AlreadyInCollection(_) | AppError::DuplicateRating { .. } => {
                ErrorKind::Conflict
            }
            AppError::CatalogUnavailable { .. } => ErrorKind::Upstream,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code rendered in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingFields => "missing_fields",
            AppError::MissingStars => "missing_stars",
            AppError::InvalidStars => "invalid_stars",
            AppError::InvalidId => "invalid_id",
            AppError::InvalidMediaType(_) => "invalid_media_type",
            AppError::InvalidUser => "invalid_user",
            AppError::InvalidBody(_) => "invalid_body",
            AppError::InvalidQuery(_) => "invalid_query",
            AppError::EmailExists => "email_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::UserNotFound => "user_not_found",
            AppError::ItemNotFound => "item_not_found",
            AppError::RatingNotFound | AppError::RouteNotFound => "not_found",
            AppError::ThreadNotFound => "thread_not_found",
            AppError::CommentNotFound => "comment_not_found",
            AppError::AlreadyInCollection(CollectionKind::Library) => "already_in_library",
            AppError::AlreadyInCollection(CollectionKind::Wishlist) => "already_in_wishlist",
            AppError::DuplicateRating { .. } => "already_rated",
            AppError::CatalogUnavailable { catalog, .. } => match *catalog {
                "omdb" => "omdb_http_error",
                _ => "igdb_http_error",
            },
            AppError::Database(_) | AppError::Internal(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = match &self {
            AppError::InvalidMediaType(_)
            | AppError::InvalidBody(_)
            | AppError::InvalidQuery(_)
            | AppError::CatalogUnavailable { .. } => Some(self.to_string()),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                None
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                None
            }
            _ => None,
        };

        let rating_id = match &self {
            AppError::DuplicateRating { rating_id } => Some(rating_id.clone()),
            _ => None,
        };

        let body = ErrorBody {
            error: self.code(),
            detail,
            rating_id,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidQuery(rejection.body_text())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable { catalog, detail } => {
                AppError::CatalogUnavailable { catalog, detail }
            }
            CatalogError::Internal(detail) => AppError::Internal(detail),
        }
    }
}

/// True when a write tripped a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

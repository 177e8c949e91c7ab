use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db::{models::Rating, timestamp_now},
    error::{is_unique_violation, AppError, Result},
    ids::{new_id, parse_record_id, value_key},
    middleware::auth::{ActorParams, Caller},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_rating)).route(
        "/:id",
        get(list_media_ratings)
            .put(update_rating)
            .delete(delete_rating),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRatingRequest {
    pub user_id: Option<String>,
    pub media_id: Option<Value>,
    pub stars: Option<Value>,
    pub review_text: Option<String>,
    pub title: Option<String>,
    pub cover_url: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub year: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRatingRequest {
    pub user_id: Option<String>,
    pub stars: Option<Value>,
    pub review_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitRatingResponse {
    pub rating_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

const RATING_COLUMNS: &str = "id, user_id, media_id, title, cover_url, media_type, year, stars, review_text, date_created";

/// Reads a star count sent as a JSON number or numeric string.
///
/// `None` means absent; out-of-range or non-integer values are rejected.
fn parse_stars(value: Option<&Value>) -> Result<Option<i64>> {
    let Some(raw) = value_key(value) else {
        return Ok(None);
    };
    let stars: i64 = raw.parse().map_err(|_| AppError::InvalidStars)?;
    if !(1..=5).contains(&stars) {
        return Err(AppError::InvalidStars);
    }
    Ok(Some(stars))
}

pub async fn ratings_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Rating>> {
    let ratings = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = ? ORDER BY date_created ASC, rowid ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ratings)
}

async fn existing_rating_id(pool: &SqlitePool, user_id: &str, media_id: &str) -> Result<Option<String>> {
    let id = sqlx::query_scalar::<_, String>(
        "SELECT id FROM ratings WHERE user_id = ? AND media_id = ?",
    )
    .bind(user_id)
    .bind(media_id)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

async fn rating_owner(pool: &SqlitePool, rating_id: &str) -> Result<String> {
    sqlx::query_scalar::<_, String>("SELECT user_id FROM ratings WHERE id = ?")
        .bind(rating_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::RatingNotFound)
}

/// Stores `rating`. Losing a race on `(user_id, media_id)` reports the rating
/// that won.
async fn insert_rating(pool: &SqlitePool, rating: &Rating) -> Result<()> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO ratings (id, user_id, media_id, title, cover_url, media_type, year, stars, review_text, date_created)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&rating.id)
    .bind(&rating.user_id)
    .bind(&rating.media_id)
    .bind(&rating.title)
    .bind(&rating.cover_url)
    .bind(&rating.media_type)
    .bind(&rating.year)
    .bind(rating.stars)
    .bind(&rating.review_text)
    .bind(&rating.date_created)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => {
            let rating_id = existing_rating_id(pool, &rating.user_id, &rating.media_id)
                .await?
                .ok_or(AppError::Database(e))?;
            Err(AppError::DuplicateRating { rating_id })
        }
        Err(e) => Err(e.into()),
    }
}

async fn submit_rating(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Json(body), _): WithRejection<Json<SubmitRatingRequest>, AppError>,
) -> Result<(StatusCode, Json<SubmitRatingResponse>)> {
    let media_id = value_key(body.media_id.as_ref());
    let stars = parse_stars(body.stars.as_ref())?;
    let user_id = caller.acting_user(body.user_id.as_deref())?;

    let (Some(media_id), Some(stars)) = (media_id, stars) else {
        return Err(AppError::MissingFields);
    };

    let user_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_one(&state.db.pool)
        .await?;
    if user_exists == 0 {
        return Err(AppError::InvalidUser);
    }

    if let Some(rating_id) = existing_rating_id(&state.db.pool, &user_id, &media_id).await? {
        return Err(AppError::DuplicateRating { rating_id });
    }

    let rating = Rating {
        id: new_id(),
        user_id,
        media_id,
        title: body.title.unwrap_or_default(),
        cover_url: body.cover_url.unwrap_or_default(),
        media_type: body.media_type.unwrap_or_default(),
        year: value_key(body.year.as_ref()).unwrap_or_default(),
        stars,
        review_text: body.review_text.unwrap_or_default(),
        date_created: timestamp_now(),
    };
    insert_rating(&state.db.pool, &rating).await?;

    tracing::info!(rating_id = %rating.id, user_id = %rating.user_id, media_id = %rating.media_id, "rating submitted");

    Ok((
        StatusCode::CREATED,
        Json(SubmitRatingResponse {
            rating_id: rating.id,
        }),
    ))
}

async fn list_media_ratings(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> Result<Json<Vec<Rating>>> {
    let ratings = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE media_id = ? ORDER BY date_created ASC, rowid ASC"
    ))
    .bind(media_id.trim())
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(ratings))
}

async fn update_rating(
    State(state): State<AppState>,
    caller: Caller,
    Path(rating_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateRatingRequest>, AppError>,
) -> Result<Json<StatusResponse>> {
    let rating_id = parse_record_id(&rating_id)?;
    let stars = parse_stars(body.stars.as_ref())?.ok_or(AppError::MissingStars)?;
    let user_id = caller.acting_user(body.user_id.as_deref())?;

    let owner = rating_owner(&state.db.pool, &rating_id).await?;
    if owner != user_id {
        return Err(AppError::Forbidden);
    }

    sqlx::query(
        "UPDATE ratings SET stars = ?, review_text = COALESCE(?, review_text) WHERE id = ? AND user_id = ?",
    )
    .bind(stars)
    .bind(body.review_text.as_deref())
    .bind(&rating_id)
    .bind(&user_id)
    .execute(&state.db.pool)
    .await?;

    Ok(Json(StatusResponse { status: "updated" }))
}

async fn delete_rating(
    State(state): State<AppState>,
    caller: Caller,
    Path(rating_id): Path<String>,
    WithRejection(Query(params), _): WithRejection<Query<ActorParams>, AppError>,
    body: Option<Json<ActorParams>>,
) -> Result<Json<StatusResponse>> {
    let rating_id = parse_record_id(&rating_id)?;
    let claimed = params.merge(body);
    let user_id = caller.acting_user(claimed.as_deref())?;

    let owner = rating_owner(&state.db.pool, &rating_id).await?;
    if owner != user_id {
        return Err(AppError::Forbidden);
    }

    let result = sqlx::query("DELETE FROM ratings WHERE id = ? AND user_id = ?")
        .bind(&rating_id)
        .bind(&user_id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::RatingNotFound);
    }

    tracing::info!(rating_id = %rating_id, "rating deleted");

    Ok(Json(StatusResponse { status: "deleted" }))
}
